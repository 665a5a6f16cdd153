//! Crate-wide error type.
use std::io;

use crate::{common::BoxError, protocol::response::ServerError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible errors produced by this driver.
#[derive(thiserror::Error)]
pub enum Error {
    /// Socket/transport failure: refused, closed, timed out, or no pool up.
    #[error("connection error: {0}")]
    Connection(ConnectionError),

    /// Unexpected opcode, bad version byte, or a malformed frame.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The type codec could not encode or decode a value.
    #[error("malformed value: {0}")]
    MalformedValue(#[from] MalformedValue),

    /// The server refused the configured credentials.
    #[error("authentication error: {0}")]
    Authentication(BoxError),

    /// A decoded `ERROR` response from the server.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// Caller misuse: named values in a batch, a bad port, an unknown
    /// load-balancing policy name, and similar unrecoverable input errors.
    #[error("invalid arguments: {0}")]
    InvalidArguments(BoxError),

    /// The client-side deadline elapsed before the server responded.
    #[error("operation timed out")]
    Timeout,

    /// Plain I/O failure not otherwise classified.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl Error {
    pub fn invalid_arguments(msg: impl Into<BoxError>) -> Error {
        Error::InvalidArguments(msg.into())
    }

    pub fn authentication(msg: impl Into<BoxError>) -> Error {
        Error::Authentication(msg.into())
    }

    pub(crate) fn connection(reason: ConnectionError) -> Error {
        Error::Connection(reason)
    }
}

/// Reasons a connection-level operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connect failed: {0}")]
    Connect(io::Error),
    #[error("connection closed")]
    Closed,
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("cluster has no connected node")]
    NotConnected,
}

impl From<ConnectionError> for Error {
    fn from(value: ConnectionError) -> Self {
        Error::Connection(value)
    }
}

/// Frame or opcode level protocol mismatch.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("response version byte {0:#x} does not have the high bit set")]
    BadVersion(u8),
    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),
    #[error("frame body length {declared} exceeds available {available} bytes")]
    TruncatedBody { declared: usize, available: usize },
    #[error("unexpected message {found:#x} during {phase}")]
    UnexpectedMessage { found: u8, phase: &'static str },
}

/// Type codec encode/decode failure.
#[derive(Debug, thiserror::Error)]
pub enum MalformedValue {
    #[error("declared length {declared} does not match {actual} available bytes")]
    LengthMismatch { declared: i32, actual: usize },
    #[error("invalid utf-8 in a text value: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("negative collection count {0}")]
    NegativeCount(i32),
    #[error("value type oid mismatch: expected {expected:#06x}, found {found:#06x}")]
    TypeMismatch { expected: u16, found: u16 },
    #[error("column {0} not found")]
    ColumnNotFound(String),
}
