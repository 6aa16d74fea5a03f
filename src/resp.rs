//! # RESP: Redis Serialization Protocol, version 2
//!
//! RESP is a length-prefixed, `CRLF`-framed, textually-introduced binary
//! protocol. The first byte of every value on the wire identifies its type:
//! * `+` for Simple Strings
//! * `-` for Errors
//! * `:` for Integers
//! * `$` for Bulk Strings
//! * `*` for Arrays
//!
//! Clients send commands as arrays of bulk strings; the server replies with
//! any of the five types, nested to arbitrary depth inside arrays. Bulk
//! strings are binary-safe and limited to 512 MiB. A length of exactly `-1`
//! on a bulk string or an array encodes the protocol's distinguished absence.
//!
//! This module holds the typed [`Response`] union, the type [`Marker`]s, and
//! the encoders: [`encode_command`] writes an outbound command frame into a
//! caller-provided buffer, and [`Response::to_bytes`] produces the canonical
//! serialisation of a reply value.
//!
//! [Official documentation](https://redis.io/docs/latest/develop/reference/protocol-spec/)

use crate::cmd::Command;
use crate::errors::{BufferFull, RESPError};
use bytes::Bytes;
use std::fmt::{self, Display, Formatter};

/// The protocol's frame terminator, which always separates its parts.
pub(crate) const CRLF: &[u8] = b"\r\n";

/// A single, complete server reply.
///
/// Array elements are themselves `Response` values and may recurse to
/// arbitrary depth. A decoded `Response` is always complete: no child is
/// pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A single-line string, e.g. `+OK\r\n`. Never contains the terminator.
    SimpleString(String),

    /// A single-line server-error message, e.g. `-ERR unknown command\r\n`.
    ///
    /// Well-formed on the wire, so it is data rather than a session failure;
    /// the caller chooses whether to treat it as one.
    Error(String),

    /// A signed 64-bit integer, e.g. `:1000\r\n`.
    Integer(i64),

    /// A binary-safe bulk string of 0 to 512 MiB, e.g. `$5\r\nhello\r\n`.
    Bytes(Bytes),

    /// The distinguished absence, from either `$-1\r\n` or `*-1\r\n`.
    Nil,

    /// An ordered, possibly empty, possibly nested sequence of replies.
    Array(Vec<Response>),
}

impl Response {
    /// True for `-` replies.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Serialises the canonical RESP v2 encoding of this value.
    ///
    /// [`Response::Nil`] uses the null-bulk form `$-1\r\n`.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::new();
        self.write(&mut out);
        Bytes::from(out)
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Response::SimpleString(s) => {
                out.push(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(CRLF);
            }
            Response::Error(msg) => {
                out.push(b'-');
                out.extend_from_slice(msg.as_bytes());
                out.extend_from_slice(CRLF);
            }
            Response::Integer(n) => {
                out.extend_from_slice(format!(":{n}\r\n").as_bytes());
            }
            Response::Bytes(payload) => {
                out.extend_from_slice(format!("${}\r\n", payload.len()).as_bytes());
                out.extend_from_slice(payload);
                out.extend_from_slice(CRLF);
            }
            Response::Nil => {
                out.extend_from_slice(b"$-1\r\n");
            }
            Response::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.write(out);
                }
            }
        }
    }
}

/// Renders replies the way an interactive client would print them.
impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Response::SimpleString(s) => write!(f, "{s}"),
            Response::Error(msg) => write!(f, "(error) {msg}"),
            Response::Integer(n) => write!(f, "(integer) {n}"),
            Response::Bytes(payload) => write!(f, "\"{}\"", String::from_utf8_lossy(payload)),
            Response::Nil => write!(f, "(nil)"),
            Response::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}

/// RESP v2 type markers: the first byte of every value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    SimpleString,
    Error,
    Integer,
    BulkString,
    Array,
}

impl TryFrom<u8> for Marker {
    type Error = RESPError;

    fn try_from(value: u8) -> Result<Marker, RESPError> {
        match value {
            b'+' => Ok(Marker::SimpleString),
            b'-' => Ok(Marker::Error),
            b':' => Ok(Marker::Integer),
            b'$' => Ok(Marker::BulkString),
            b'*' => Ok(Marker::Array),
            v => Err(RESPError::UnknownMarker(v)),
        }
    }
}

/// Writes the complete RESP frame for one command into `dst` at `offset`.
///
/// The frame is `*<N>\r\n` followed by one `$<len>\r\n<bytes>\r\n` bulk
/// string per verb token and per argument, where `N` is the token count plus
/// the argument count. Returns the offset just past the frame.
///
/// Fails with [`BufferFull`] when the frame does not fit; bytes past `offset`
/// are then unspecified and the caller must keep its cursor at `offset` so
/// the partial write stays invisible. Encoding is deterministic: the same
/// command always produces the same bytes.
pub fn encode_command(dst: &mut [u8], offset: usize, command: &Command) -> Result<usize, BufferFull> {
    let count = command.verb_tokens().len() + command.args().len();
    let mut at = put(dst, offset, b"*")?;
    at = put_decimal(dst, at, count)?;
    at = put(dst, at, CRLF)?;
    for token in command.verb_tokens() {
        at = put_bulk(dst, at, token.as_bytes())?;
    }
    for arg in command.args() {
        at = put_bulk(dst, at, arg)?;
    }
    Ok(at)
}

fn put_bulk(dst: &mut [u8], offset: usize, payload: &[u8]) -> Result<usize, BufferFull> {
    let mut at = put(dst, offset, b"$")?;
    at = put_decimal(dst, at, payload.len())?;
    at = put(dst, at, CRLF)?;
    at = put(dst, at, payload)?;
    put(dst, at, CRLF)
}

fn put(dst: &mut [u8], offset: usize, src: &[u8]) -> Result<usize, BufferFull> {
    let end = offset.checked_add(src.len()).ok_or(BufferFull)?;
    if end > dst.len() {
        return Err(BufferFull);
    }
    dst[offset..end].copy_from_slice(src);
    Ok(end)
}

// Decimal fields are ASCII; any ASCII-superset argument encoding therefore
// produces identical framing bytes.
fn put_decimal(dst: &mut [u8], offset: usize, mut n: usize) -> Result<usize, BufferFull> {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    put(dst, offset, &digits[i..])
}
