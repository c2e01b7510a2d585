//! Reusable pool of raw-line buffers. Buffers are borrowed before a batch is
//! populated and returned after the insertion driver has consumed it, on both
//! success and failure paths, so the set of outstanding buffers stays bounded
//! by the number of batches in flight.

use std::sync::{Arc, Mutex};

/// A shared pool of `String` buffers. Cloning the pool clones a handle to the
/// same free list; buffers flow back automatically when their guard drops.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<String>>,
    buffer_capacity: usize,
    max_retained: usize,
}

impl BufferPool {
    /// Creates a pool handing out buffers pre-sized to `buffer_capacity`
    /// bytes and retaining at most `max_retained` returned buffers.
    pub fn new(buffer_capacity: usize, max_retained: usize) -> Self {
        BufferPool {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                buffer_capacity,
                max_retained,
            }),
        }
    }

    /// Borrows a cleared buffer from the pool, allocating a fresh one when the
    /// free list is empty. The buffer returns to the pool when the guard drops.
    pub fn acquire(&self) -> PooledBuffer {
        // A poisoned free list only costs reuse; hand out a fresh allocation.
        let recycled = self
            .inner
            .free
            .lock()
            .ok()
            .and_then(|mut free| free.pop());
        let buf = recycled.unwrap_or_else(|| String::with_capacity(self.inner.buffer_capacity));
        PooledBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    /// Number of buffers currently sitting in the free list.
    pub fn available(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }

    fn release(&self, mut buf: String) {
        buf.clear();
        if let Ok(mut free) = self.inner.free.lock() {
            if free.len() < self.inner.max_retained {
                free.push(buf);
            }
        }
    }
}

/// Scoped borrow of one pool buffer. Dropping the guard clears the buffer and
/// hands it back to the pool, which guarantees release on every exit path.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<String>,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Read-only view of the accumulated text.
    pub fn as_str(&self) -> &str {
        self.buf.as_deref().unwrap_or("")
    }

    /// Appends raw text to the buffer.
    pub fn push_str(&mut self, text: &str) {
        if let Some(buf) = self.buf.as_mut() {
            buf.push_str(text);
        }
    }

    /// Appends a single character (the batching layer uses this for the
    /// newline terminator).
    pub fn push(&mut self, ch: char) {
        if let Some(buf) = self.buf.as_mut() {
            buf.push(ch);
        }
    }

    /// Length of the accumulated text in bytes.
    pub fn len(&self) -> usize {
        self.buf.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    /// Returns true if no text has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_roundtrip() {
        let pool = BufferPool::new(64, 4);
        assert_eq!(pool.available(), 0);

        let mut buf = pool.acquire();
        buf.push_str("hello");
        assert_eq!(buf.as_str(), "hello");
        drop(buf);

        assert_eq!(pool.available(), 1, "dropped buffer should return to pool");
    }

    #[test]
    fn released_buffer_is_reused_and_cleared() {
        let pool = BufferPool::new(64, 4);
        let mut buf = pool.acquire();
        buf.push_str("stale contents");
        drop(buf);

        let reused = pool.acquire();
        assert_eq!(pool.available(), 0, "free list should be drained");
        assert!(reused.is_empty(), "recycled buffer must come back cleared");
    }

    #[test]
    fn pool_retains_at_most_max_buffers() {
        let pool = BufferPool::new(16, 2);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn pool_handles_concurrent_borrowers() {
        use std::thread;

        let pool = BufferPool::new(32, 8);
        let mut handles = vec![];
        for i in 0..4 {
            let pool_clone = pool.clone();
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    let mut buf = pool_clone.acquire();
                    buf.push_str(&format!("{}-{}", i, j));
                    assert!(!buf.is_empty());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.available() <= 8);
    }
}
