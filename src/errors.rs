// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type shared by the port and
//! FASL decoder layers.

use std::error::Error as StdError;
use std::fmt;

/// The byte/row/column location a decode or port error occurred at, for
/// inclusion in user-visible messages (spec §7: "messages must include the
/// port's byte offset and, for text ports, row/column").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    pub byte_offset: u64,
    pub row_col: Option<(u64, u64)>,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_col {
            Some((row, col)) => write!(f, "offset {} (row {}, col {})", self.byte_offset, row, col),
            None => write!(f, "offset {}", self.byte_offset),
        }
    }
}

/// `LispIoError` enumerates everything that can go wrong reading or writing
/// a port, or decoding a FASL stream from one.
#[derive(Debug)]
pub enum LispIoError {
    /// The underlying backend failed to read or write.
    Io(Box<dyn StdError + Send + Sync>),
    /// The stream contained malformed data and could not be decoded (spec §7, "Structural").
    Decode { message: &'static str, at: ErrorLocation },
    /// A bounded resource was exhausted: loader stack depth, table index range (spec §7, "Resource").
    Resource { message: &'static str, at: ErrorLocation },
    /// A name could not be resolved: package, subr, struct layout (spec §7, "Lookup").
    Lookup { message: &'static str, name: String, at: ErrorLocation },
    /// An operation was invoked in a context that does not support it: loader op
    /// outside the loader, a binary-only op on a text port, unread buffer overflow
    /// (spec §7, "Usage").
    Usage { message: &'static str, at: ErrorLocation },
    /// End of stream was reached where at least one more byte/value was required.
    Eof,
}

impl fmt::Display for LispIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispIoError::Io(err) => write!(f, "io error: {err}"),
            LispIoError::Decode { message, at } => write!(f, "malformed fasl stream at {at}: {message}"),
            LispIoError::Resource { message, at } => write!(f, "resource limit at {at}: {message}"),
            LispIoError::Lookup { message, name, at } => {
                write!(f, "lookup failed at {at}: {message} ({name:?})")
            }
            LispIoError::Usage { message, at } => write!(f, "invalid use at {at}: {message}"),
            LispIoError::Eof => write!(f, "unexpected end of stream"),
        }
    }
}

impl StdError for LispIoError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            LispIoError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LispIoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => LispIoError::Eof,
            _ => LispIoError::Io(Box::new(err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, LispIoError>;

/// Convenience constructor for a structural decode error.
pub fn decode_error<T>(message: &'static str, at: ErrorLocation) -> Result<T> {
    Err(LispIoError::Decode { message, at })
}

/// Convenience constructor for a resource-limit error.
pub fn resource_error<T>(message: &'static str, at: ErrorLocation) -> Result<T> {
    Err(LispIoError::Resource { message, at })
}

/// Convenience constructor for a name-lookup error.
pub fn lookup_error<T>(message: &'static str, name: impl Into<String>, at: ErrorLocation) -> Result<T> {
    Err(LispIoError::Lookup { message, name: name.into(), at })
}

/// Convenience constructor for a usage error.
pub fn usage_error<T>(message: &'static str, at: ErrorLocation) -> Result<T> {
    Err(LispIoError::Usage { message, at })
}

/// Convenience constructor for an end-of-stream error.
pub fn eof_error<T>() -> Result<T> {
    Err(LispIoError::Eof)
}
