//! # redis-wire
//!
//! A RESP v2 wire-protocol engine for clients of Redis-compatible in-memory
//! stores: an encoder for outbound commands, a streaming decoder for inbound
//! replies, an adaptive send buffer, and a duplex session binding all three
//! to one transport.

pub mod cli;
pub mod cmd;
pub mod conn;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod queue;
pub mod resp;
pub mod send_buf;
