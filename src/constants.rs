//! # Constants
//!
//! Protocol limits and tunables used throughout the library

/// Local host IPv4 address and port of a Redis-compatible server
pub const LOCAL_SOCKET_ADDR_STR: &str = "127.0.0.1:6379";

/// Upper bound on a bulk string payload: 512 MiB
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Upper bound on a simple string or error line before its terminating `CRLF`
pub const MAX_LINE_LEN: usize = MAX_BULK_LEN;

/// Upper bound on an integer or length line: the decimal length of [`i64::MIN`]
pub const MAX_INTEGER_LINE_LEN: usize = 20;

/// Initial (and floor) capacity of the adaptive send buffer
pub const DEFAULT_SEND_BUFFER_SIZE: usize = 16 * 1024;

/// Environment variable that overrides [`DEFAULT_SEND_BUFFER_SIZE`] process-wide
pub const SEND_BUFFER_SIZE_ENV: &str = "REDIS_WIRE_SEND_BUFFER_SIZE";

/// Capacity of a single transport read
pub const READ_CHUNK_LEN: usize = 4096;
