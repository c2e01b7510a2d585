//! Upstream batch source: groups raw lines from any `BufRead` into pooled
//! batches, counting rows and metric values as it goes. The counters travel
//! with the batch and come back unchanged as the reported totals after a
//! successful insert.

use crate::buffer::BufferPool;
use crate::error::LoadError;
use crate::types::Batch;

use std::io::BufRead;

/// Reads lines and emits batches of at most `batch_size` rows, stopping at
/// end of input or after `limit` total rows when a limit is set.
pub struct LineBatcher<R: BufRead> {
    reader: R,
    pool: BufferPool,
    batch_size: usize,
    limit: Option<u64>,
    rows_emitted: u64,
    line: String,
    done: bool,
}

impl<R: BufRead> LineBatcher<R> {
    pub fn new(reader: R, pool: BufferPool, batch_size: usize, limit: Option<u64>) -> Self {
        LineBatcher {
            reader,
            pool,
            batch_size,
            limit,
            rows_emitted: 0,
            line: String::new(),
            done: false,
        }
    }

    /// Returns the next batch, or `Ok(None)` once the input (or the row
    /// limit) is exhausted. The batch buffer comes from the pool and flows
    /// back to it when the batch is dropped.
    pub fn next_batch(&mut self) -> Result<Option<Batch>, LoadError> {
        if self.done {
            return Ok(None);
        }

        let mut buf = self.pool.acquire();
        let mut rows = 0u64;
        let mut metrics = 0u64;

        while rows < self.batch_size as u64 {
            if let Some(limit) = self.limit {
                if self.rows_emitted >= limit {
                    self.done = true;
                    break;
                }
            }

            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.done = true;
                break;
            }
            let record = self.line.trim_end_matches(['\n', '\r']);
            if record.is_empty() {
                continue;
            }

            buf.push_str(record);
            buf.push('\n');
            rows += 1;
            metrics += count_metrics(record);
            self.rows_emitted += 1;
        }

        if rows == 0 {
            // Nothing accumulated; the pooled buffer drops straight back.
            return Ok(None);
        }
        Ok(Some(Batch { buf, metrics, rows }))
    }

    /// Total rows handed out so far.
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }
}

/// Counts the field values carried by one line without fully parsing it: the
/// fields segment is comma-separated, one value per assignment.
fn count_metrics(record: &str) -> u64 {
    record
        .split(' ')
        .nth(1)
        .map(|fields| fields.split(',').count() as u64)
        .unwrap_or(0)
}
