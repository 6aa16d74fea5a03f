//! # Connection
//!
//! The duplex session controller: binds one transport endpoint to the codec
//! and the send buffer, prefetches reads, coalesces writes, and performs
//! orderly half-close.
//!
//! A single request connection carries pipelined traffic: sends are staged
//! and flushed in one transport write, and replies come back in submission
//! order, so a caller can issue several commands before reading the first
//! reply. All session state is owned by the [`Connection`] and driven from
//! one task; operations take `&mut self` and suspend only at transport reads
//! and writes.

use crate::cmd::Command;
use crate::constants::{DEFAULT_SEND_BUFFER_SIZE, READ_CHUNK_LEN, SEND_BUFFER_SIZE_ENV};
use crate::decoder::ResponseDecoder;
use crate::errors::SessionError;
use crate::queue::ByteQueue;
use crate::resp::Response;
use crate::send_buf::SendBuffer;
use bytes::{Bytes, BytesMut};
use futures::FutureExt;
use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Per-session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Initial (and floor) capacity of the adaptive send buffer.
    pub send_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_buffer_size: DEFAULT_SEND_BUFFER_SIZE,
        }
    }
}

impl SessionConfig {
    /// Reads the process-wide override from the environment, falling back to
    /// the default when the variable is absent or unparsable.
    pub fn from_env() -> Self {
        let send_buffer_size = std::env::var(SEND_BUFFER_SIZE_ENV)
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_SEND_BUFFER_SIZE);
        Self { send_buffer_size }
    }
}

/// A duplex RESP session over one reliable ordered byte stream.
#[derive(Debug)]
pub struct Connection<T> {
    transport: T,
    queue: ByteQueue,
    decoder: ResponseDecoder,
    send_buf: SendBuffer,
    /// At most one deferred flush is pending at a time.
    flush_posted: bool,
    read_done: bool,
    write_done: bool,
    closed: bool,
    /// Error observed by the prefetch read or a mid-send flush, surfaced at
    /// the next operation.
    pending_error: Option<std::io::Error>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            queue: ByteQueue::new(),
            decoder: ResponseDecoder::new(),
            send_buf: SendBuffer::new(config.send_buffer_size),
            flush_posted: false,
            read_done: false,
            write_done: false,
            closed: false,
            pending_error: None,
        }
    }

    /// Returns the next complete response from the peer.
    ///
    /// Any posted flush runs first, so a read never waits behind staged
    /// commands. While the queue cannot produce a full value, one transport
    /// read at a time is awaited and decoding resumes. A read of zero bytes
    /// while a response is owed is a truncation and closes the session.
    /// After a value is returned, one opportunistic read keeps the queue
    /// filling while the caller processes the reply.
    pub async fn receive(&mut self) -> Result<Response, SessionError> {
        self.ensure_ready().await?;
        self.run_posted_flush().await?;
        loop {
            match self.decoder.try_decode(&mut self.queue) {
                Ok(Some(response)) => {
                    self.prefetch();
                    return Ok(response);
                }
                Ok(None) => {
                    if self.read_done {
                        return Err(self.fail(SessionError::Truncated).await);
                    }
                    self.fill_queue().await?;
                }
                Err(err) => return Err(self.fail(SessionError::Protocol(err)).await),
            }
        }
    }

    /// Stages one command and posts a deferred flush.
    ///
    /// The acknowledgement is immediate and never carries a transport
    /// error: the append may flush mid-call when the command outgrows the
    /// buffer, and a write failure there is parked like a prefetch failure,
    /// surfacing through the shared close path on the next operation. All
    /// sends issued before the posted flush runs coalesce into a single
    /// transport write.
    pub async fn send(&mut self, command: &Command) -> Result<(), SessionError> {
        self.ensure_ready().await?;
        if self.write_done {
            return Err(SessionError::Closed);
        }
        trace!("staging {:?}", command.verb());
        if let Err(err) = self.send_buf.stage(&mut self.transport, command).await {
            self.pending_error = Some(err);
            return Ok(());
        }
        self.flush_posted = true;
        Ok(())
    }

    /// Runs the posted flush, if any.
    pub async fn flush(&mut self) -> Result<(), SessionError> {
        self.ensure_ready().await?;
        self.run_posted_flush().await
    }

    /// Flushes staged commands and half-closes the write side. Once the
    /// read side is also done the session closes cleanly.
    pub async fn send_end_of_stream(&mut self) -> Result<(), SessionError> {
        self.ensure_ready().await?;
        self.run_posted_flush().await?;
        if let Err(err) = self.transport.shutdown().await {
            return Err(self.fail(SessionError::Transport(err)).await);
        }
        self.write_done = true;
        self.close_if_done();
        Ok(())
    }

    /// Tunnels one raw chunk to the peer over the same transport, after any
    /// staged commands so the wire order matches the call order.
    pub async fn send_binary(&mut self, chunk: &[u8]) -> Result<(), SessionError> {
        self.ensure_ready().await?;
        if self.write_done {
            return Err(SessionError::Closed);
        }
        self.run_posted_flush().await?;
        if let Err(err) = self.transport.write_all(chunk).await {
            return Err(self.fail(SessionError::Transport(err)).await);
        }
        Ok(())
    }

    /// Receives the next raw chunk, draining bytes already prefetched into
    /// the queue before touching the transport. `None` means the peer has
    /// finished its stream; the read side is then done.
    pub async fn receive_binary(&mut self) -> Result<Option<Bytes>, SessionError> {
        self.ensure_ready().await?;
        self.run_posted_flush().await?;
        if !self.queue.is_empty() {
            let buffered = self.queue.remaining_bytes();
            return Ok(Some(self.queue.take_exact(buffered)));
        }
        if self.read_done {
            self.close_if_done();
            return Ok(None);
        }
        let mut chunk = BytesMut::with_capacity(READ_CHUNK_LEN);
        match self.transport.read_buf(&mut chunk).await {
            Ok(0) => {
                self.read_done = true;
                self.close_if_done();
                Ok(None)
            }
            Ok(n) => {
                trace!("tunnelled {} raw bytes in", n);
                Ok(Some(chunk.freeze()))
            }
            Err(err) => Err(self.fail(SessionError::Transport(err)).await),
        }
    }

    /// Closes the session immediately, dropping partial state. Idempotent.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.teardown();
        let _ = self.transport.shutdown().await;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True once the peer's stream has ended.
    pub fn is_read_done(&self) -> bool {
        self.read_done
    }

    /// True once the write side has been half-closed.
    pub fn is_write_done(&self) -> bool {
        self.write_done
    }

    async fn ensure_ready(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if let Some(err) = self.pending_error.take() {
            return Err(self.fail(SessionError::Transport(err)).await);
        }
        Ok(())
    }

    async fn run_posted_flush(&mut self) -> Result<(), SessionError> {
        if !self.flush_posted {
            return Ok(());
        }
        // Cleared before the flush runs so a failure does not re-run it.
        self.flush_posted = false;
        debug!("flushing {} coalesced bytes", self.send_buf.staged_bytes());
        if let Err(err) = self.send_buf.flush(&mut self.transport).await {
            return Err(self.fail(SessionError::Transport(err)).await);
        }
        Ok(())
    }

    /// Reads one chunk from the transport into the queue. A zero-length
    /// read marks the read side done; the caller decides whether that is a
    /// clean half-close or a truncation.
    async fn fill_queue(&mut self) -> Result<(), SessionError> {
        let mut chunk = BytesMut::with_capacity(READ_CHUNK_LEN);
        match self.transport.read_buf(&mut chunk).await {
            Ok(0) => {
                self.read_done = true;
                Ok(())
            }
            Ok(n) => {
                trace!("read {} bytes", n);
                self.queue.push(chunk.freeze());
                Ok(())
            }
            Err(err) => Err(self.fail(SessionError::Transport(err)).await),
        }
    }

    /// Issues one opportunistic read after a completed response, so the next
    /// reply accumulates while the caller processes this one and a
    /// half-closed peer is noticed early. A not-ready transport is left
    /// alone.
    fn prefetch(&mut self) {
        if self.closed || self.read_done || !self.queue.is_empty() {
            return;
        }
        let mut chunk = BytesMut::with_capacity(READ_CHUNK_LEN);
        match self.transport.read_buf(&mut chunk).now_or_never() {
            None => {}
            Some(Ok(0)) => {
                trace!("peer half-closed during prefetch");
                self.read_done = true;
            }
            Some(Ok(n)) => {
                trace!("prefetched {} bytes", n);
                self.queue.push(chunk.freeze());
            }
            Some(Err(err)) => self.pending_error = Some(err),
        }
    }

    /// Closes cleanly once both directions are finished.
    fn close_if_done(&mut self) {
        if self.read_done && self.write_done && !self.closed {
            debug!("both directions done, closing session");
            self.teardown();
        }
    }

    /// Tears the session down with `err`: scratch state is recycled, the
    /// transport is shut down, and subsequent operations fail with
    /// [`SessionError::Closed`].
    async fn fail(&mut self, err: SessionError) -> SessionError {
        warn!("closing session: {}", err);
        self.teardown();
        let _ = self.transport.shutdown().await;
        err
    }

    fn teardown(&mut self) {
        self.closed = true;
        self.queue.recycle();
        self.send_buf.recycle();
        self.decoder.reset();
    }
}
