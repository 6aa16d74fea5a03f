//! # Errors
//!
//! Error types used in the library

use std::string::FromUtf8Error;
use thiserror::Error;

/// Protocol violations detected while decoding a server reply.
///
/// Every variant is terminal for the session that produced it; the session
/// closes with the error and outstanding operations fail.
#[derive(Debug, Error, PartialEq)]
pub enum RESPError {
    #[error("unknown first byte: 0x{0:02x}")]
    UnknownMarker(u8),

    #[error("no CRLF within the {0}-byte line limit")]
    LineTooLong(usize),

    #[error("couldn't parse {0:?} to integer")]
    IntegerParseError(String),

    #[error("missing CRLF after bulk string contents")]
    MissingCRLF,

    #[error("invalid length: {0}")]
    InvalidSize(i64),

    #[error("invalid UTF-8 in simple string or error line")]
    Utf8(#[from] FromUtf8Error),
}

/// Errors surfaced by [`crate::conn::Connection`] operations.
///
/// A reply of the RESP error type is not represented here: the server spoke
/// the protocol correctly, so it is delivered as a
/// [`Response::Error`](crate::resp::Response::Error) value and the caller
/// decides whether to propagate it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] RESPError),

    #[error("transport ended before a complete response")]
    Truncated,

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Signals that an encode did not fit in the remaining buffer space.
///
/// The send buffer reacts by rolling its cursor back, flushing, and retrying
/// the encode into a larger buffer.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("command does not fit in the remaining buffer space")]
pub struct BufferFull;
