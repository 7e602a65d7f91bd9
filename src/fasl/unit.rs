// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The loader entry point: repeatedly drives [`super::decoder::fast_read_with_loader`]
//! over a port until it yields the eof sentinel, executing `define`/`apply`
//! side effects against a [`super::LoaderHost`] as it goes. `BEGIN_LOAD_UNIT`/
//! `END_LOAD_UNIT` are just named markers logged along the way — loading
//! itself only ends at the eof sentinel, not at a unit boundary, matching a
//! FASL image that need not close its final unit explicitly.

pub use super::decoder::fasl_load;
