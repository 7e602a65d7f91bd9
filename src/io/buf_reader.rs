// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;

use super::PortBackend;
use crate::errors::Result;

/// An in-memory [`PortBackend`] that reads from (and appends to) an owned
/// byte buffer. This is the workhorse backend for tests and for loading FASL
/// images that are already resident in memory.
pub struct MemoryBackend {
    buf: Vec<u8>,
    pos: usize,
}

impl MemoryBackend {
    pub fn new(buf: Vec<u8>) -> Self {
        MemoryBackend { buf, pos: 0 }
    }

    /// Consumes the backend, returning the accumulated buffer. Useful when a
    /// `MemoryBackend` was used as a write sink.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn get_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl PortBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = cmp::min(self.buf.len() - self.pos, buf.len());
        buf[..len].copy_from_slice(&self.buf[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buf.extend_from_slice(buf);
        self.pos = self.buf.len();
        Ok(buf.len())
    }

    fn length(&self) -> Option<u64> {
        Some(self.buf.len() as u64)
    }
}
