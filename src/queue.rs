//! # Byte Queue
//!
//! An ordered sequence of immutable byte chunks sitting between the transport
//! and the decoder. The transport appends whole chunks as they arrive; the
//! decoder consumes them byte-wise, chunk-wise, or in exact slices. All
//! operations are amortised O(1) per byte moved.

use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ByteQueue {
    chunks: VecDeque<Bytes>,
    remaining: usize,
}

impl ByteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk to the back of the queue. Empty chunks are dropped.
    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.remaining += chunk.len();
        self.chunks.push_back(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Total number of buffered bytes across all chunks.
    pub fn remaining_bytes(&self) -> usize {
        self.remaining
    }

    pub fn has_remaining_bytes(&self, n: usize) -> bool {
        self.remaining >= n
    }

    /// The front chunk, without consuming it. Never an empty slice.
    pub fn peek_chunk(&self) -> Option<&[u8]> {
        self.chunks.front().map(|chunk| chunk.as_ref())
    }

    /// Removes and returns the front byte.
    pub fn pop_byte(&mut self) -> Option<u8> {
        let byte = *self.chunks.front()?.first()?;
        self.advance(1);
        Some(byte)
    }

    /// Discards `n` bytes from the front. Must not exceed the buffered total.
    pub fn advance(&mut self, mut n: usize) {
        debug_assert!(n <= self.remaining);
        self.remaining -= n;
        while n > 0 {
            let first = self.chunks.front_mut().expect("advance past end of queue");
            if n < first.len() {
                first.advance(n);
                return;
            }
            n -= first.len();
            self.chunks.pop_front();
        }
    }

    /// Takes exactly `n` buffered bytes as one contiguous chunk.
    ///
    /// Zero-copy when the front chunk already covers the request.
    pub fn take_exact(&mut self, n: usize) -> Bytes {
        debug_assert!(self.has_remaining_bytes(n));
        if let Some(first) = self.chunks.front_mut() {
            if first.len() >= n {
                self.remaining -= n;
                let taken = first.split_to(n);
                if first.is_empty() {
                    self.chunks.pop_front();
                }
                return taken;
            }
        }
        let mut out = BytesMut::with_capacity(n);
        self.drain_into(&mut out, n);
        out.freeze()
    }

    /// Moves up to `n` front bytes into `dst`, returning how many were taken.
    pub fn drain_into(&mut self, dst: &mut BytesMut, mut n: usize) -> usize {
        let mut taken = 0;
        while n > 0 {
            let Some(first) = self.chunks.front_mut() else {
                break;
            };
            let step = n.min(first.len());
            dst.extend_from_slice(&first[..step]);
            first.advance(step);
            if first.is_empty() {
                self.chunks.pop_front();
            }
            self.remaining -= step;
            taken += step;
            n -= step;
        }
        taken
    }

    /// Drops all buffered chunks.
    pub fn recycle(&mut self) {
        self.chunks.clear();
        self.remaining = 0;
    }

    /// Iterates the buffered bytes front to back without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter().copied())
    }
}
