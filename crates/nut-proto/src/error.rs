use thiserror::Error;

/// Unified error type for the wire protocol engine and session client.
///
/// Variants are structured, not stringly-typed, so a caller can
/// programmatically distinguish a retryable condition (`Timeout`) from a
/// server-rejected one (`Protocol`) rather than matching on message text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not resolve host")]
    UnknownHost,

    #[error("not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("unexpected reply: {0}")]
    InvalidResponse(String),

    #[error("server error: {code}")]
    Protocol { code: String },

    #[error("bad HID report descriptor: {0}")]
    BadDescriptor(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
