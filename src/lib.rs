// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `fasl-core` implements the FASL (fast-load) binary deserializer and the
//! port abstraction it depends on — the interpreter core of a Lisp-family
//! runtime's image loading path.
//!
//! - [`io`]: the polymorphic byte/character port.
//! - [`fasl`]: the opcode-driven decoder, its embedded loader, and the
//!   package registry loaded symbols resolve against.
//! - [`values`]: the [`values::ValueFactory`] trait a host implements to
//!   give the decoder somewhere to build values.
//! - [`errors`]: the shared error type returned throughout.
//!
//! The evaluator, garbage collector, and subr registry are external
//! collaborators reached only through [`fasl::LoaderHost`].

pub mod errors;
pub mod fasl;
pub mod io;
pub mod values;

pub use errors::{LispIoError, Result};
