use crate::buffer::PooledBuffer;
use std::collections::HashMap;

/// Timestamp type (raw epoch integer, nanosecond resolution; no unit
/// conversion is applied anywhere in the pipeline).
pub type Timestamp = i64;

/// Value type.
pub type Value = f64;

/// TagSet type (using a HashMap for flexibility).
pub type TagSet = HashMap<String, String>;

/// One unit of work: a pooled text buffer of newline-terminated raw lines plus
/// the counters the batching layer accumulated while filling it. The counters
/// pass through the insertion path unchanged and come back as the reported
/// write totals on success.
#[derive(Debug)]
pub struct Batch {
    /// Raw lines, newline-joined, ending with a trailing newline.
    pub buf: PooledBuffer,
    /// Number of field values carried by the batch.
    pub metrics: u64,
    /// Number of raw lines (rows) in the batch.
    pub rows: u64,
}

impl Batch {
    /// Iterates the raw lines of the batch, discarding the empty slice after
    /// the trailing newline.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buf.as_str().split_terminator('\n')
    }

    /// Returns true if the batch holds no lines.
    pub fn is_empty(&self) -> bool {
        self.buf.as_str().is_empty()
    }
}
