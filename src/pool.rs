//! Bounded buffer reuse: hands out cleared `Vec<u8>` buffers and recycles
//! them on release.
//!
//! A fixed-capacity `crossbeam::channel` holds the pre-cleared buffers; once
//! the channel is empty a new buffer is allocated on demand rather than
//! blocking, so callers never stall waiting for a buffer back.

use crossbeam::channel::{bounded, Receiver, Sender};

pub struct BytePool {
    capacity: usize,
    free: Sender<Vec<u8>>,
    reclaim: Receiver<Vec<u8>>,
}

impl BytePool {
    pub fn new(capacity: usize) -> Self {
        let (free, reclaim) = bounded(capacity.max(1));
        Self {
            capacity,
            free,
            reclaim,
        }
    }

    /// Takes a cleared buffer from the pool, or allocates a fresh one if the
    /// pool is currently empty.
    pub fn take(&self) -> Vec<u8> {
        self.reclaim.try_recv().unwrap_or_default()
    }

    /// Returns `buf` to the pool after clearing it. Dropped silently if the
    /// pool is already at capacity.
    pub fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        let _ = self.free.try_send(buf);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
