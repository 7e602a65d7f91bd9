// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `fasl` module implements the FASL (fast-load) binary decoder: an
//! opcode-driven reader that materializes a graph of dynamically typed Lisp
//! values — including shared and cyclic structure — through a host-provided
//! [`crate::values::ValueFactory`], plus an embedded loader that executes
//! `define`/`apply` side effects while decoding a load unit.

mod decoder;
mod defs;
mod loader;
mod opcode;
mod registry;
mod unit;

pub use decoder::{fast_read, fast_read_with_loader};
pub use defs::DefinitionTable;
pub use loader::{LoaderHost, LoaderStack};
pub use opcode::Opcode;
pub use registry::PackageRegistry;
pub use unit::fasl_load;
