// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements the port abstraction the FASL decoder depends on.
//!
//! A [`Port`] wraps a [`PortBackend`] — the dynamically dispatched capability
//! record a concrete byte source/sink provides (file, in-memory buffer, pipe,
//! ...) — and layers mode (binary/text), CRLF translation, peek/unread, and
//! position tracking on top. [`ReadBytes`] gives typed fixed-width integer and
//! IEEE-754 reads on top of any port.

mod buf_reader;
mod port;

pub use buf_reader::MemoryBackend;
pub use port::{Port, PortOptions};

use crate::errors::{usage_error, ErrorLocation, Result};

/// A port's direction, modeled as a bitflag set so "both" is simply the union
/// of `INPUT` and `OUTPUT` rather than a fourth enum case to keep in sync.
pub mod direction {
    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct PortDirection: u8 {
            const INPUT = 0b01;
            const OUTPUT = 0b10;
        }
    }
}
pub use direction::PortDirection;

/// Binary ports move raw bytes; text ports move characters and carry the
/// CRLF-translation, row/column, and unread-buffer state described in the
/// port data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    Binary,
    Text,
}

/// The capability record a concrete byte source/sink provides. This is the
/// "port class dispatch table" of the spec, re-expressed as a trait object:
/// a backend that doesn't support an operation simply inherits the default
/// (report unsupported, or a no-op where that is sensible), rather than the
/// port having to check a table of nullable function pointers.
pub trait PortBackend {
    /// Reads up to `buf.len()` raw bytes. Returns `Ok(0)` at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let _ = buf;
        usage_error("backend does not support reading", ErrorLocation::default())
    }

    /// Writes `buf` verbatim. Returns the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let _ = buf;
        usage_error("backend does not support writing", ErrorLocation::default())
    }

    /// Flushes any buffered output. A backend with nothing to flush is a no-op.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases backend resources. Called once, before `gc_free` semantics
    /// (here: before the `Port` is dropped) apply.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether a subsequent `read` would return data without blocking.
    /// Backends that cannot answer cheaply should default to `true`.
    fn read_readyp(&self) -> bool {
        true
    }

    /// The total length in bytes, if knowable without an expensive probe.
    fn length(&self) -> Option<u64> {
        None
    }
}
