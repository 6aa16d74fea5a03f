//! # Streaming RESP v2 Decoder
//!
//! Incrementally parses server replies out of arbitrarily chunked input.
//! Whenever the queue runs out mid-value the decoder parks its progress and
//! returns `None`; the next call resumes without re-consuming earlier bytes.
//!
//! Arrays nest to arbitrary depth, so resumption must work at any depth. A
//! recursive decode cannot park its call stack between input events, which is
//! why nesting is modelled as an explicit stack of counters over the
//! partially-built array tree: completing an element decrements the top
//! frame, and a frame reaching zero pops as a completed array that itself
//! counts as an element of the frame below.

use crate::constants::{MAX_BULK_LEN, MAX_INTEGER_LINE_LEN, MAX_LINE_LEN};
use crate::errors::RESPError;
use crate::queue::ByteQueue;
use crate::resp::{Marker, Response};
use bytes::BytesMut;
use memchr::memmem;
use std::mem;

/// Scratch state for the value currently being decoded.
///
/// Owned exclusively by the decoder and reset once a top-level value has
/// been returned.
#[derive(Debug, Default)]
enum State {
    /// Between values: the next byte is a type marker.
    #[default]
    Idle,
    /// Accumulating a `CRLF`-terminated line: the payload of `+ - :` values
    /// and the length line of `$ *` values.
    Line { marker: Marker, scratch: Vec<u8> },
    /// Copying the fixed-size body of a bulk string.
    Bulk { scratch: BytesMut, remaining: usize },
    /// Consuming the `CRLF` that closes a bulk string body.
    BulkTerm { scratch: BytesMut, seen_cr: bool },
}

/// One partially-built array on the nesting stack.
#[derive(Debug)]
struct ArrayFrame {
    /// Elements still to decode before this frame completes.
    remaining: usize,
    items: Vec<Response>,
}

#[derive(Debug, Default)]
pub struct ResponseDecoder {
    state: State,
    stack: Vec<ArrayFrame>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no value is partially decoded. The session uses this to
    /// tell a clean half-close from truncation.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle) && self.stack.is_empty()
    }

    /// Drops any partial progress (close path).
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.stack.clear();
    }

    /// Consumes as many bytes from `queue` as form one complete top-level
    /// response and returns it. Returns `Ok(None)` when the queue does not
    /// yet hold a complete value. Decoding is strictly left-to-right: an
    /// element's marker is read only after the enclosing array's length, and
    /// each element completes before the next begins.
    pub fn try_decode(&mut self, queue: &mut ByteQueue) -> Result<Option<Response>, RESPError> {
        loop {
            let completed = match mem::take(&mut self.state) {
                State::Idle => {
                    let Some(byte) = queue.pop_byte() else {
                        return Ok(None);
                    };
                    self.state = State::Line {
                        marker: Marker::try_from(byte)?,
                        scratch: Vec::new(),
                    };
                    continue;
                }
                State::Line { marker, mut scratch } => {
                    if !take_line(queue, &mut scratch, line_limit(marker))? {
                        self.state = State::Line { marker, scratch };
                        return Ok(None);
                    }
                    match marker {
                        Marker::SimpleString => Response::SimpleString(String::from_utf8(scratch)?),
                        Marker::Error => Response::Error(String::from_utf8(scratch)?),
                        Marker::Integer => Response::Integer(parse_i64(&scratch)?),
                        Marker::BulkString => {
                            match checked_len(parse_i64(&scratch)?, MAX_BULK_LEN)? {
                                None => Response::Nil,
                                Some(len) => {
                                    self.state = State::Bulk {
                                        scratch: BytesMut::with_capacity(len),
                                        remaining: len,
                                    };
                                    continue;
                                }
                            }
                        }
                        Marker::Array => match checked_len(parse_i64(&scratch)?, usize::MAX)? {
                            None => Response::Nil,
                            Some(0) => Response::Array(Vec::new()),
                            Some(len) => {
                                self.stack.push(ArrayFrame {
                                    remaining: len,
                                    items: Vec::with_capacity(len),
                                });
                                continue;
                            }
                        },
                    }
                }
                State::Bulk {
                    mut scratch,
                    mut remaining,
                } => {
                    remaining -= queue.drain_into(&mut scratch, remaining);
                    if remaining > 0 {
                        self.state = State::Bulk { scratch, remaining };
                        return Ok(None);
                    }
                    self.state = State::BulkTerm {
                        scratch,
                        seen_cr: false,
                    };
                    continue;
                }
                State::BulkTerm {
                    scratch,
                    mut seen_cr,
                } => {
                    loop {
                        let Some(byte) = queue.pop_byte() else {
                            self.state = State::BulkTerm { scratch, seen_cr };
                            return Ok(None);
                        };
                        match (seen_cr, byte) {
                            (false, b'\r') => seen_cr = true,
                            (true, b'\n') => break,
                            _ => return Err(RESPError::MissingCRLF),
                        }
                    }
                    Response::Bytes(scratch.freeze())
                }
            };

            if let Some(response) = self.complete(completed) {
                return Ok(Some(response));
            }
        }
    }

    /// Folds a finished value into the enclosing array frames, popping every
    /// frame whose counter reaches zero. Returns the top-level value once
    /// the stack empties.
    fn complete(&mut self, value: Response) -> Option<Response> {
        let mut value = value;
        loop {
            let Some(top) = self.stack.last_mut() else {
                return Some(value);
            };
            top.items.push(value);
            top.remaining -= 1;
            if top.remaining > 0 {
                return None;
            }
            let frame = self.stack.pop().expect("non-empty stack");
            value = Response::Array(frame.items);
        }
    }
}

fn line_limit(marker: Marker) -> usize {
    match marker {
        Marker::SimpleString | Marker::Error => MAX_LINE_LEN,
        Marker::Integer | Marker::BulkString | Marker::Array => MAX_INTEGER_LINE_LEN,
    }
}

/// Moves bytes from `queue` into `scratch` until the first CR immediately
/// followed by LF; returns true once the terminator has been consumed, with
/// the payload left in `scratch`. Whole chunks are stashed as they are ruled
/// out, keeping the shared queue compact under small-chunk input. A CR at the
/// end of `scratch` pairs with an LF at the head of the next chunk, so the
/// terminator may span a chunk boundary; a stray CR not followed by LF is
/// part of the payload.
fn take_line(
    queue: &mut ByteQueue,
    scratch: &mut Vec<u8>,
    limit: usize,
) -> Result<bool, RESPError> {
    loop {
        let Some(chunk) = queue.peek_chunk() else {
            return Ok(false);
        };
        if scratch.last() == Some(&b'\r') && chunk[0] == b'\n' {
            scratch.pop();
            queue.advance(1);
            return Ok(true);
        }
        if let Some(pos) = memmem::find(chunk, b"\r\n") {
            if scratch.len() + pos > limit {
                return Err(RESPError::LineTooLong(limit));
            }
            scratch.extend_from_slice(&chunk[..pos]);
            queue.advance(pos + 2);
            return Ok(true);
        }
        // A trailing CR may still turn out to be the terminator, so it gets
        // one byte of slack against the limit.
        let trailing_cr = usize::from(chunk[chunk.len() - 1] == b'\r');
        if scratch.len() + chunk.len() - trailing_cr > limit {
            return Err(RESPError::LineTooLong(limit));
        }
        let consumed = chunk.len();
        scratch.extend_from_slice(chunk);
        queue.advance(consumed);
    }
}

fn parse_i64(line: &[u8]) -> Result<i64, RESPError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| RESPError::IntegerParseError(String::from_utf8_lossy(line).into_owned()))
}

/// Validates a `$` or `*` length line: exactly `-1` is nil, `0..=max` is a
/// real length, anything else is rejected.
fn checked_len(len: i64, max: usize) -> Result<Option<usize>, RESPError> {
    if len == -1 {
        return Ok(None);
    }
    if len < -1 || u64::try_from(len).is_ok_and(|n| n > max as u64) {
        return Err(RESPError::InvalidSize(len));
    }
    Ok(Some(len as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn queue_of(bytes: &[u8]) -> ByteQueue {
        let mut queue = ByteQueue::new();
        queue.push(Bytes::copy_from_slice(bytes));
        queue
    }

    fn decode(bytes: &[u8]) -> Result<Option<Response>, RESPError> {
        ResponseDecoder::new().try_decode(&mut queue_of(bytes))
    }

    fn decode_value(bytes: &[u8]) -> Response {
        decode(bytes).unwrap().expect("complete frame")
    }

    /// Feeds `bytes` in chunks of `chunk_len` and returns the decoded value.
    fn decode_chunked(bytes: &[u8], chunk_len: usize) -> Response {
        let mut decoder = ResponseDecoder::new();
        let mut queue = ByteQueue::new();
        let mut decoded = None;
        for chunk in bytes.chunks(chunk_len) {
            queue.push(Bytes::copy_from_slice(chunk));
            if let Some(value) = decoder.try_decode(&mut queue).unwrap() {
                decoded = Some(value);
            }
        }
        assert!(decoder.is_idle());
        decoded.expect("complete frame")
    }

    #[test]
    fn test_simple_string() {
        assert_eq!(
            decode_value(b"+OK\r\n"),
            Response::SimpleString("OK".into())
        );
    }

    #[test]
    fn test_simple_string_byte_at_a_time() {
        assert_eq!(
            decode_chunked(b"+OK\r\n", 1),
            Response::SimpleString("OK".into())
        );
    }

    #[test]
    fn test_empty_simple_string() {
        assert_eq!(decode_value(b"+\r\n"), Response::SimpleString("".into()));
    }

    #[test]
    fn test_error_is_a_value() {
        assert_eq!(
            decode_value(b"-ERR unknown command\r\n"),
            Response::Error("ERR unknown command".into())
        );
    }

    #[test]
    fn test_stray_cr_is_kept_in_the_payload() {
        assert_eq!(
            decode_value(b"+he\rllo\r\n"),
            Response::SimpleString("he\rllo".into())
        );
        assert_eq!(
            decode_chunked(b"+he\rllo\r\n", 1),
            Response::SimpleString("he\rllo".into())
        );
    }

    #[test]
    fn test_integer_extremes() {
        assert_eq!(
            decode_value(b":9223372036854775807\r\n"),
            Response::Integer(i64::MAX)
        );
        assert_eq!(
            decode_value(b":-9223372036854775808\r\n"),
            Response::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_non_numeric_integer_is_malformed() {
        assert_eq!(
            decode(b":abc\r\n"),
            Err(RESPError::IntegerParseError("abc".into()))
        );
    }

    #[test]
    fn test_integer_line_limit() {
        assert_eq!(
            decode(b":123456789012345678901\r\n"),
            Err(RESPError::LineTooLong(MAX_INTEGER_LINE_LEN))
        );
    }

    #[test]
    fn test_length_line_limit() {
        assert_eq!(
            decode(b"$123456789012345678901\r\n"),
            Err(RESPError::LineTooLong(MAX_INTEGER_LINE_LEN))
        );
    }

    #[test]
    fn test_bulk_string() {
        assert_eq!(
            decode_value(b"$5\r\nhello\r\n"),
            Response::Bytes(Bytes::from_static(b"hello"))
        );
    }

    #[test]
    fn test_empty_bulk_string() {
        assert_eq!(
            decode_value(b"$0\r\n\r\n"),
            Response::Bytes(Bytes::from_static(b""))
        );
    }

    #[test]
    fn test_bulk_string_with_embedded_crlf() {
        let expected = Response::Bytes(Bytes::from_static(b"hello \r\n world"));
        assert_eq!(decode_value(b"$14\r\nhello \r\n world\r\n"), expected);
        // A chunk boundary inside the payload does not break decoding.
        for chunk_len in 1..8 {
            assert_eq!(
                decode_chunked(b"$14\r\nhello \r\n world\r\n", chunk_len),
                expected
            );
        }
    }

    #[test]
    fn test_missing_crlf_after_bulk_body() {
        assert_eq!(decode(b"$3\r\nabcXY"), Err(RESPError::MissingCRLF));
    }

    #[test]
    fn test_null_bulk_and_null_array_both_decode_to_nil() {
        assert_eq!(decode_value(b"$-1\r\n"), Response::Nil);
        assert_eq!(decode_value(b"*-1\r\n"), Response::Nil);
    }

    #[test]
    fn test_length_below_minus_one_is_invalid() {
        assert_eq!(decode(b"$-2\r\n"), Err(RESPError::InvalidSize(-2)));
        assert_eq!(decode(b"*-3\r\n"), Err(RESPError::InvalidSize(-3)));
    }

    #[test]
    fn test_bulk_length_over_limit_is_invalid() {
        assert_eq!(
            decode(b"$536870913\r\n"),
            Err(RESPError::InvalidSize(536870913))
        );
    }

    #[test]
    fn test_unknown_marker() {
        assert_eq!(decode(b"x"), Err(RESPError::UnknownMarker(b'x')));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(decode_value(b"*0\r\n"), Response::Array(vec![]));
    }

    #[test]
    fn test_nested_array_with_nil_element() {
        let expected = Response::Array(vec![
            Response::Array(vec![Response::SimpleString("a".into())]),
            Response::Nil,
        ]);
        assert_eq!(decode_value(b"*2\r\n*1\r\n+a\r\n$-1\r\n"), expected);
    }

    #[test]
    fn test_mixed_array() {
        assert_eq!(
            decode_value(b"*3\r\n:1\r\n$5\r\nhello\r\n-oops\r\n"),
            Response::Array(vec![
                Response::Integer(1),
                Response::Bytes(Bytes::from_static(b"hello")),
                Response::Error("oops".into()),
            ])
        );
    }

    #[test]
    fn test_six_levels_of_nesting() {
        let mut wire = Vec::new();
        for _ in 0..6 {
            wire.extend_from_slice(b"*1\r\n");
        }
        wire.extend_from_slice(b"+test\r\n");

        let mut expected = Response::SimpleString("test".into());
        for _ in 0..6 {
            expected = Response::Array(vec![expected]);
        }

        assert_eq!(decode_value(&wire), expected);
        assert_eq!(decode_chunked(&wire, 1), expected);
    }

    #[test]
    fn test_resumes_mid_array_across_calls() {
        let mut decoder = ResponseDecoder::new();
        let mut queue = ByteQueue::new();

        queue.push(Bytes::from_static(b"*2\r\n+a"));
        assert_eq!(decoder.try_decode(&mut queue).unwrap(), None);
        assert!(!decoder.is_idle());

        queue.push(Bytes::from_static(b"\r\n+b\r\n"));
        assert_eq!(
            decoder.try_decode(&mut queue).unwrap(),
            Some(Response::Array(vec![
                Response::SimpleString("a".into()),
                Response::SimpleString("b".into()),
            ]))
        );
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_back_to_back_frames_in_one_buffer() {
        let mut decoder = ResponseDecoder::new();
        let mut queue = queue_of(b"+first\r\n:2\r\n");
        assert_eq!(
            decoder.try_decode(&mut queue).unwrap(),
            Some(Response::SimpleString("first".into()))
        );
        assert_eq!(
            decoder.try_decode(&mut queue).unwrap(),
            Some(Response::Integer(2))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue_yields_none() {
        let mut decoder = ResponseDecoder::new();
        assert_eq!(decoder.try_decode(&mut ByteQueue::new()).unwrap(), None);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_chunk_invariance_random_partitions() {
        use rand::Rng;

        let frame = b"*4\r\n$6\r\nab\r\ncd\r\n:-70\r\n*2\r\n+ok\r\n$-1\r\n-ERR x\r\n";
        let expected = decode_value(frame);
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let mut decoder = ResponseDecoder::new();
            let mut queue = ByteQueue::new();
            let mut decoded = None;
            let mut at = 0;
            while at < frame.len() {
                let step = rng.gen_range(1..=100usize).min(frame.len() - at);
                queue.push(Bytes::copy_from_slice(&frame[at..at + step]));
                at += step;
                if let Some(value) = decoder.try_decode(&mut queue).unwrap() {
                    decoded = Some(value);
                }
            }
            assert_eq!(decoded.as_ref(), Some(&expected));
        }
    }

    #[test]
    fn test_round_trip_law() {
        let values = vec![
            Response::SimpleString("OK".into()),
            Response::Error("ERR wrong number of arguments".into()),
            Response::Integer(i64::MIN),
            Response::Integer(0),
            Response::Bytes(Bytes::from_static(b"binary \r\n \x00 safe")),
            Response::Nil,
            Response::Array(vec![]),
            Response::Array(vec![
                Response::Array(vec![Response::Integer(1), Response::Nil]),
                Response::SimpleString("deep".into()),
                Response::Bytes(Bytes::from_static(b"")),
            ]),
        ];
        for value in values {
            assert_eq!(decode_value(&value.to_bytes()), value);
        }
    }
}
