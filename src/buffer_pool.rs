//! Reusable byte buffers for rendering card Markdown
//!
//! Each card job renders several small Markdown files. Instead of allocating a fresh
//! `Vec<u8>` per file, jobs borrow a buffer from a shared [`BufferPool`]. The
//! [`PooledBuffer`] guard hands the buffer back on drop, so early returns through `?`
//! never leak it.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

/// Buffers that grew beyond this capacity are dropped instead of pooled
pub const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// Default number of idle buffers kept around
pub const DEFAULT_MAX_IDLE: usize = 32;

/// Capacity of freshly allocated buffers
const INITIAL_CAPACITY: usize = 4 * 1024;

struct PoolInner {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        // A panic while holding the lock cannot leave a Vec<Vec<u8>> inconsistent
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            tracing::trace!(capacity = buf.capacity(), "dropping oversized buffer");
            return;
        }
        buf.clear();
        let mut buffers = self.lock();
        if buffers.len() < self.max_idle {
            buffers.push(buf);
        }
    }
}

/// Shared pool of byte buffers
///
/// Cheap to clone; clones share the same idle set.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.inner.max_idle)
            .finish()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    /// Create a pool keeping at most [`DEFAULT_MAX_IDLE`] idle buffers
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Create a pool keeping at most `max_idle` idle buffers
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                buffers: Mutex::new(Vec::new()),
                max_idle,
            }),
        }
    }

    /// Borrow an empty buffer, reusing an idle one when available
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self
            .inner
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_CAPACITY));
        PooledBuffer {
            buf,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of idle buffers currently pooled
    pub fn idle(&self) -> usize {
        self.inner.lock().len()
    }
}

/// A buffer borrowed from a [`BufferPool`]
///
/// Dereferences to `Vec<u8>`, so `std::io::Write` works on it directly. Returned to the
/// pool (cleared) when dropped.
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PooledBuffer {
    /// Clear the contents while keeping the allocation, for rendering the next file
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
