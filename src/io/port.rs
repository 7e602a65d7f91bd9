// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smallvec::SmallVec;

use super::{PortBackend, PortDirection, PortMode};
use crate::errors::{usage_error, ErrorLocation, Result};
use crate::fasl::{DefinitionTable, LoaderStack};

/// The unread buffer holds at most this many characters (spec §3: "a small
/// compile-time constant, e.g. 4").
const UNREAD_BUFFER_CAP: usize = 4;

/// Runtime-configurable knobs for a [`Port`], mirroring
/// `MediaSourceStreamOptions`'s role in `symphonia-core`: a small `Default`-able
/// struct passed to the constructor rather than a builder.
#[derive(Debug, Clone, Copy)]
pub struct PortOptions {
    /// Whether a freshly opened text port translates CRLF on input/output.
    pub crlf_translate: bool,
    /// Initial capacity of the FASL definition table, lazily allocated on
    /// first use (spec §3, constant `D`).
    pub fasl_table_initial_capacity: usize,
    /// Depth of the FASL loader operand stack (spec §3, constant `S`).
    pub loader_stack_depth: usize,
}

impl Default for PortOptions {
    fn default() -> Self {
        PortOptions { crlf_translate: true, fasl_table_initial_capacity: 256, loader_stack_depth: 256 }
    }
}

/// Per-instance state for a text port: unread buffer, CRLF translation flag,
/// and position tracking. Absent entirely on binary ports (spec §3 invariant).
struct TextState {
    unread: SmallVec<[u32; UNREAD_BUFFER_CAP]>,
    crlf_translate: bool,
    needs_lf: bool,
    row: u64,
    column: u64,
    previous_line_length: u64,
}

impl TextState {
    fn new(crlf_translate: bool) -> Self {
        TextState {
            unread: SmallVec::new(),
            crlf_translate,
            needs_lf: false,
            row: 1,
            column: 0,
            previous_line_length: 0,
        }
    }
}

/// A polymorphic byte/character stream: binary or text mode, optional CRLF
/// translation, peek/unread, byte and (for text ports) row/column position
/// tracking, plus the FASL-reader attachment (definition table, loader
/// stack, loader accumulator) described in spec §3.
///
/// `V` is the host's Lisp value type — the same type the FASL decoder's
/// [`crate::fasl::ValueFactory`] produces. A port's FASL attachment is typed
/// over it because a runtime only ever has one value representation.
pub struct Port<V> {
    backend: Box<dyn PortBackend>,
    name: String,
    direction: PortDirection,
    mode: PortMode,
    bytes_read: u64,
    bytes_written: u64,
    text: Option<TextState>,
    pub(crate) fasl_defs: Option<DefinitionTable<V>>,
    pub(crate) fasl_table_initial_capacity: usize,
    pub(crate) loader_stack: LoaderStack<V>,
    pub(crate) loader_accum: Option<V>,
}

impl<V> Port<V> {
    pub fn new(
        name: impl Into<String>,
        direction: PortDirection,
        mode: PortMode,
        backend: Box<dyn PortBackend>,
        options: PortOptions,
    ) -> Self {
        Port {
            backend,
            name: name.into(),
            direction,
            text: match mode {
                PortMode::Text => Some(TextState::new(options.crlf_translate)),
                PortMode::Binary => None,
            },
            mode,
            bytes_read: 0,
            bytes_written: 0,
            fasl_defs: None,
            fasl_table_initial_capacity: options.fasl_table_initial_capacity,
            loader_stack: LoaderStack::new(options.loader_stack_depth),
            loader_accum: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.mode, PortMode::Binary)
    }

    pub fn is_input(&self) -> bool {
        self.direction.contains(PortDirection::INPUT)
    }

    pub fn is_output(&self) -> bool {
        self.direction.contains(PortDirection::OUTPUT)
    }

    pub fn is_closed(&self) -> bool {
        self.direction.is_empty()
    }

    /// Current raw byte offset, counting bytes transferred, not post-translation
    /// characters (spec §3 invariant).
    pub fn pos(&self) -> u64 {
        self.bytes_read
    }

    /// Current (row, column), 1-indexed row / 0-indexed column, for text ports.
    pub fn row_col(&self) -> Option<(u64, u64)> {
        self.text.as_ref().map(|t| (t.row, t.column))
    }

    /// The error location to attach to any error raised while operating on
    /// this port (spec §7: messages must include byte offset and, for text
    /// ports, row/column).
    pub fn error_location(&self) -> ErrorLocation {
        ErrorLocation { byte_offset: self.bytes_read, row_col: self.row_col() }
    }

    fn require_input(&self) -> Result<()> {
        if !self.is_input() || self.is_closed() {
            return usage_error("port is not open for input", self.error_location());
        }
        Ok(())
    }

    fn require_output(&self) -> Result<()> {
        if !self.is_output() || self.is_closed() {
            return usage_error("port is not open for output", self.error_location());
        }
        Ok(())
    }

    fn require_binary(&self) -> Result<()> {
        if !self.is_binary() {
            return usage_error("operation requires a binary port", self.error_location());
        }
        Ok(())
    }

    /// Reads up to `buf.len()` raw bytes, honoring no translation whatsoever.
    /// Used directly by binary-port callers and as the foundation for
    /// character reads on text ports.
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.require_input()?;
        let n = self.backend.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }

    /// Fills `buf` completely, or reports `false` if the stream ran out
    /// first, whether that happened before any byte arrived or partway
    /// through. Callers that know what they were decoding (a fixnum, a
    /// flonum, a string) turn a `false` into the spec-mandated
    /// "incomplete &lt;kind&gt;" error themselves; this layer has no kind to
    /// name.
    fn read_raw_exact(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_raw(&mut buf[filled..])?;
            if n == 0 {
                return Ok(false);
            }
            filled += n;
        }
        Ok(true)
    }

    /// Writes `buf` verbatim with no translation.
    pub fn write_raw(&mut self, buf: &[u8]) -> Result<usize> {
        self.require_output()?;
        let n = self.backend.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.require_output()?;
        self.backend.flush()
    }

    /// Closes the port: flushes first if it is open for output, then
    /// releases the backend. Further reads/writes fail.
    pub fn close(&mut self) -> Result<()> {
        if self.is_output() && !self.is_closed() {
            self.flush()?;
        }
        self.backend.close()?;
        self.direction = PortDirection::empty();
        Ok(())
    }

    /// Reads one character. Binary ports yield one raw byte widened to `u32`;
    /// text ports consult the unread buffer first (LIFO), then apply CRLF
    /// translation per spec §4.1. Returns `Ok(None)` at end of stream.
    pub fn read_char(&mut self) -> Result<Option<u32>> {
        if self.is_binary() {
            let mut byte = [0u8; 1];
            return if self.read_raw(&mut byte)? == 0 { Ok(None) } else { Ok(Some(byte[0] as u32)) };
        }

        let ch = if let Some(buffered) = self.text.as_mut().and_then(|t| t.unread.pop()) {
            Some(buffered)
        } else {
            let mut byte = [0u8; 1];
            if self.read_raw(&mut byte)? == 0 {
                None
            } else {
                let raw = byte[0] as u32;
                let text = self.text.as_mut().expect("text port has text state");
                if text.crlf_translate {
                    if raw == b'\r' as u32 {
                        text.needs_lf = true;
                        Some(b'\n' as u32)
                    } else if text.needs_lf {
                        text.needs_lf = false;
                        if raw == b'\n' as u32 {
                            // The LF half of a CRLF pair: swallow it and recurse so
                            // position counters are not double-counted (spec §4.1).
                            return self.read_char();
                        }
                        Some(raw)
                    } else {
                        Some(raw)
                    }
                } else {
                    Some(raw)
                }
            }
        };

        if let Some(ch) = ch {
            let text = self.text.as_mut().expect("text port has text state");
            if ch == b'\n' as u32 {
                text.row += 1;
                text.previous_line_length = text.column;
                text.column = 0;
            } else {
                text.column += 1;
            }
        }

        Ok(ch)
    }

    /// Pushes `ch` back onto the port, to be returned by the next `read_char`.
    /// Errors if the unread buffer (capacity [`UNREAD_BUFFER_CAP`]) is full, or
    /// if called on a binary port.
    pub fn unread_char(&mut self, ch: u32) -> Result<()> {
        if self.is_binary() {
            return usage_error("cannot unread on a binary port", self.error_location());
        }

        let text = self.text.as_mut().expect("text port has text state");
        if text.unread.len() >= UNREAD_BUFFER_CAP {
            return usage_error("unread buffer exceeded", self.error_location());
        }

        match ch {
            c if c == b'\n' as u32 => {
                text.row -= 1;
                text.column = text.previous_line_length;
            }
            c if c == b'\r' as u32 => {}
            _ => text.column = text.column.saturating_sub(1),
        }
        text.unread.push(ch);
        Ok(())
    }

    /// Reads then unreads one character, leaving position unchanged.
    pub fn peek_char(&mut self) -> Result<Option<u32>> {
        match self.read_char()? {
            Some(ch) => {
                self.unread_char(ch)?;
                Ok(Some(ch))
            }
            None => Ok(None),
        }
    }

    /// Writes one character, flushing immediately if it is a newline on a
    /// text port (spec §4.1: "flush on writing `\n` for text ports").
    pub fn write_char(&mut self, ch: u32) -> Result<()> {
        self.write_text(&[ch])?;
        if !self.is_binary() && ch == b'\n' as u32 {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes a run of characters, applying CRLF translation for text ports
    /// in translate mode (spec §4.1).
    pub fn write_text(&mut self, chars: &[u32]) -> Result<()> {
        if self.is_binary() {
            let bytes: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
            self.write_raw(&bytes)?;
            return Ok(());
        }

        let translate = self.text.as_ref().expect("text port has text state").crlf_translate;

        if !translate {
            for &ch in chars {
                let text = self.text.as_mut().expect("text port has text state");
                if ch == b'\n' as u32 {
                    text.row += 1;
                    text.column = 0;
                } else {
                    text.column += 1;
                }
            }
            let bytes: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
            self.write_raw(&bytes)?;
            return Ok(());
        }

        let mut start = 0;
        while start < chars.len() {
            let needs_lf = self.text.as_ref().expect("text port has text state").needs_lf;

            if needs_lf {
                if chars[start] == b'\n' as u32 {
                    start += 1;
                }
                self.write_raw(b"\n")?;
                let text = self.text.as_mut().expect("text port has text state");
                text.needs_lf = false;
                text.row += 1;
                continue;
            }

            match chars[start] {
                c if c == b'\n' as u32 => {
                    self.write_raw(b"\r\n")?;
                    let text = self.text.as_mut().expect("text port has text state");
                    text.column = 0;
                    text.row += 1;
                    start += 1;
                }
                c if c == b'\r' as u32 => {
                    self.write_raw(b"\r")?;
                    let text = self.text.as_mut().expect("text port has text state");
                    text.column = 0;
                    text.needs_lf = true;
                    start += 1;
                }
                _ => {
                    let run_end = chars[start..]
                        .iter()
                        .position(|&c| c == b'\n' as u32 || c == b'\r' as u32)
                        .map(|i| start + i)
                        .unwrap_or(chars.len());
                    let run: Vec<u8> = chars[start..run_end].iter().map(|&c| c as u8).collect();
                    self.write_raw(&run)?;
                    let text = self.text.as_mut().expect("text port has text state");
                    text.column += (run_end - start) as u64;
                    start = run_end;
                }
            }
        }

        Ok(())
    }

    /// Reads exactly `length` raw bytes (`length` ∈ {1, 2, 4, 8}) and
    /// interprets them, little-endian, as a two's-complement signed or
    /// unsigned integer of that width (spec §4.1). Returns `Ok(None)` on a
    /// short/empty read (end of stream).
    pub fn read_binary_fixnum(&mut self, length: u8, signed: bool) -> Result<Option<i64>> {
        self.require_binary()?;
        debug_assert!(matches!(length, 1 | 2 | 4 | 8));

        let mut bytes = [0u8; 8];
        if !self.read_raw_exact(&mut bytes[..length as usize])? {
            return Ok(None);
        }

        let value = match length {
            1 => {
                if signed {
                    bytes[0] as i8 as i64
                } else {
                    bytes[0] as i64
                }
            }
            2 => {
                let w = u16::from_le_bytes([bytes[0], bytes[1]]);
                if signed {
                    w as i16 as i64
                } else {
                    w as i64
                }
            }
            4 => {
                let w = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                if signed {
                    w as i32 as i64
                } else {
                    w as i64
                }
            }
            8 => {
                let w = u64::from_le_bytes(bytes);
                if signed {
                    w as i64
                } else {
                    // Widest unsigned width representable: store bit pattern as i64.
                    w as i64
                }
            }
            _ => unreachable!("length validated by caller"),
        };

        Ok(Some(value))
    }

    /// Reads 8 raw bytes and interprets them little-endian as IEEE-754
    /// binary64. Returns `Ok(None)` on a short/empty read.
    pub fn read_binary_flonum(&mut self) -> Result<Option<f64>> {
        self.require_binary()?;
        let mut bytes = [0u8; 8];
        if !self.read_raw_exact(&mut bytes)? {
            return Ok(None);
        }
        Ok(Some(f64::from_le_bytes(bytes)))
    }

    /// Fills `buf` entirely from raw stream bytes, with no width or
    /// endianness interpretation. Used for variable-length payloads (string
    /// and symbol-name bytes) whose length was already decoded separately.
    /// Returns `Ok(false)` if the stream ran out before `buf` was filled, so
    /// the caller can raise its own kind-specific "incomplete &lt;kind&gt;"
    /// error rather than the generic end-of-stream one.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<bool> {
        self.read_raw_exact(buf)
    }

    /// Defines `index` in the FASL definition table to `value`, creating the
    /// table on first use. Exposed publicly so a host can pre-seed entries
    /// (e.g. a closure already resident in its image) before decoding
    /// begins, in addition to the decoder's own use while handling
    /// `READER_DEFINE`.
    pub fn define(&mut self, index: usize, value: V)
    where
        V: Clone,
    {
        let growth_unit = self.fasl_table_initial_capacity;
        self.fasl_defs.get_or_insert_with(|| DefinitionTable::new(growth_unit)).define(index, value);
    }

    /// Looks up a previously defined table entry, if any.
    pub fn lookup_definition(&self, index: usize) -> Option<&V> {
        self.fasl_defs.as_ref().and_then(|t| t.get(index))
    }

    /// Consumes raw bytes until the next `\n`, `\r`, or end of stream
    /// (inclusive of none): used by the FASL `COMMENT` opcodes.
    pub fn skip_to_newline(&mut self) -> Result<()> {
        loop {
            let mut byte = [0u8; 1];
            if self.read_raw(&mut byte)? == 0 {
                return Ok(());
            }
            if byte[0] == b'\n' || byte[0] == b'\r' {
                return Ok(());
            }
        }
    }
}

