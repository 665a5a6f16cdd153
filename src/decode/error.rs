//! Row/column decode failures.
use std::fmt;

#[derive(Clone)]
pub enum DecodeError {
    /// The requested column name or index isn't present in the result set.
    ColumnNotFound(String),
    /// The column's wire type id doesn't match what `T` expects.
    TypeMismatch { expected: u16, found: u16 },
    /// The column is `NULL` and `T` isn't an `Option`.
    UnexpectedNull,
    /// The bytes for a `text`/`ascii` column weren't valid UTF-8.
    Utf8(std::str::Utf8Error),
    /// A fixed-width column's byte length didn't match its type.
    LengthMismatch { expected: usize, found: usize },
    /// A collection/tuple/UDT payload's internal framing didn't parse —
    /// a negative element count, a truncated length-prefixed field, and
    /// the like.
    Invalid(String),
}

impl std::error::Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::ColumnNotFound(name) => write!(f, "column {name} not found"),
            DecodeError::TypeMismatch { expected, found } => {
                write!(f, "column type mismatch: expected {expected:#06x}, found {found:#06x}")
            }
            DecodeError::UnexpectedNull => write!(f, "unexpected NULL for a non-Option column"),
            DecodeError::Utf8(e) => write!(f, "invalid utf-8: {e}"),
            DecodeError::LengthMismatch { expected, found } => {
                write!(f, "expected {expected} bytes, found {found}")
            }
            DecodeError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(value: std::str::Utf8Error) -> Self {
        DecodeError::Utf8(value)
    }
}

impl From<DecodeError> for crate::error::Error {
    fn from(value: DecodeError) -> Self {
        crate::error::Error::invalid_arguments(value)
    }
}
