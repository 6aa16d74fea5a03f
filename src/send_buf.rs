//! # Send Buffer
//!
//! Stages encoded commands between the caller and the transport in a single
//! contiguous buffer whose capacity adapts to the traffic: it jumps to the
//! size of any command that exceeds it and decays geometrically back toward
//! the configured default as flushes go by.
//!
//! Commands are encoded speculatively rather than pre-measured; an encode
//! that runs out of space rolls the cursor back, flushes the staged bytes,
//! and retries into a strictly larger buffer.

use crate::cmd::Command;
use crate::resp::encode_command;
use bytes::BytesMut;
use log::trace;
use std::mem;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub struct SendBuffer {
    buf: BytesMut,
    /// End of the staged bytes; everything past it is free space.
    cursor: usize,
    /// Adaptive capacity target for fresh allocations.
    buffer_size: usize,
    initial_size: usize,
}

impl SendBuffer {
    pub fn new(initial_size: usize) -> Self {
        Self {
            buf: BytesMut::zeroed(initial_size),
            cursor: 0,
            buffer_size: initial_size,
            initial_size,
        }
    }

    /// Number of staged, unflushed bytes.
    pub fn staged_bytes(&self) -> usize {
        self.cursor
    }

    /// Current adaptive capacity target.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Appends one encoded command.
    ///
    /// On overflow the cursor rolls back so no partial bytes are visible,
    /// the staged bytes are flushed as-is, and the encode retries into a
    /// buffer grown past the space that proved too small. Every round either
    /// succeeds or strictly grows the buffer, so the loop terminates.
    pub async fn stage<T>(&mut self, transport: &mut T, command: &Command) -> std::io::Result<()>
    where
        T: AsyncWrite + Unpin,
    {
        loop {
            let begin = self.cursor;
            match encode_command(&mut self.buf, begin, command) {
                Ok(end) => {
                    self.cursor = end;
                    let size = end - begin;
                    if size > self.buffer_size {
                        // Grow aggressively on evidence of bigger commands.
                        self.buffer_size = size;
                    }
                    return Ok(());
                }
                Err(_) => {
                    let free = self.buf.len() - begin;
                    self.flush(transport).await?;
                    let grown = free + free / 2 + 1;
                    if grown > self.buf.len() {
                        self.buf = BytesMut::zeroed(grown);
                    }
                }
            }
        }
    }

    /// Hands the staged bytes to the transport in one write and prepares a
    /// fresh buffer of [`buffer_size`](Self::buffer_size) capacity. With
    /// nothing staged this is a no-op.
    pub async fn flush<T>(&mut self, transport: &mut T) -> std::io::Result<()>
    where
        T: AsyncWrite + Unpin,
    {
        if self.cursor == 0 {
            return Ok(());
        }
        let mut staged = mem::replace(&mut self.buf, BytesMut::new());
        staged.truncate(self.cursor);
        self.cursor = 0;
        // Decay geometrically back toward the default once a burst passes.
        if self.buffer_size > self.initial_size {
            self.buffer_size = (self.buffer_size - self.buffer_size / 256).max(self.initial_size);
        }
        self.buf = BytesMut::zeroed(self.buffer_size);
        trace!("flushing {} staged bytes", staged.len());
        transport.write_all(&staged).await
    }

    /// Drops staged bytes and releases the allocation (close path).
    pub fn recycle(&mut self) {
        self.buf = BytesMut::new();
        self.cursor = 0;
    }
}
