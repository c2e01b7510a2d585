//! Insertion driver: consumes one batch end-to-end. Two passes assemble the
//! batch-local index and dense matrix, then the bulk insert runs against the
//! worker's session with a fixed retry budget. Insert failures never escape
//! this module; exhausting the budget degrades to zero reported counts so the
//! run keeps going.

use crate::client::{ColumnInsert, ColumnStore, DataType};
use crate::error::LoadError;
use crate::index::BatchIndex;
use crate::matrix::fill_matrix;
use crate::telemetry::{load_metrics, LoadEvent, LoadEventListener};
use crate::types::Batch;

use std::sync::Arc;
use std::time::Instant;

/// Number of times one batch's bulk insert is attempted before the batch is
/// declared lost. No delay between attempts; adding backoff would change the
/// observed throughput under load.
pub const INSERT_ATTEMPTS: u32 = 3;

/// Per-worker driver owning the worker's storage session. Each batch gets a
/// fresh retry budget; no retry state crosses batches.
pub struct InsertDriver {
    store: Box<dyn ColumnStore>,
    events: Arc<dyn LoadEventListener>,
    worker: usize,
    do_load: bool,
}

impl InsertDriver {
    pub fn new(
        store: Box<dyn ColumnStore>,
        events: Arc<dyn LoadEventListener>,
        worker: usize,
        do_load: bool,
    ) -> Self {
        InsertDriver {
            store,
            events,
            worker,
            do_load,
        }
    }

    /// Processes one batch, returning the (metric count, row count) actually
    /// written: the batch's own counters on success, (0, 0) when every insert
    /// attempt failed. Malformed input is the only error that propagates.
    pub fn process_batch(&mut self, batch: &Batch) -> Result<(u64, u64), LoadError> {
        if !self.do_load {
            return Ok((0, 0));
        }

        let index = BatchIndex::from_lines(batch.lines())?;
        if index.is_empty() {
            return Ok((batch.metrics, batch.rows));
        }
        let matrix = fill_matrix(&index, batch.lines())?;
        let data_types = vec![DataType::Double; index.path_count()];
        let request = ColumnInsert {
            paths: index.paths(),
            timestamps: index.timestamps(),
            values: &matrix,
            data_types: &data_types,
            tags: index.path_tags(),
        };

        let started = Instant::now();
        let mut last_error: Option<LoadError> = None;
        for attempt in 1..=INSERT_ATTEMPTS {
            match self.store.insert_columns(&request) {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    log::info!(
                        "worker {}: insert ok in {} ms (attempt {}, {} paths, {} timestamps)",
                        self.worker,
                        elapsed.as_millis(),
                        attempt,
                        index.path_count(),
                        index.timestamp_count()
                    );
                    self.events.on_event(LoadEvent::InsertSucceeded {
                        worker: self.worker,
                        attempt,
                        elapsed_ms: elapsed.as_millis() as u64,
                        paths: index.path_count(),
                        timestamps: index.timestamp_count(),
                    });
                    load_metrics::record_insert(elapsed, batch.metrics, batch.rows);
                    return Ok((batch.metrics, batch.rows));
                }
                Err(e) => {
                    log::warn!(
                        "worker {}: insert attempt {}/{} failed after {} ms: {}",
                        self.worker,
                        attempt,
                        INSERT_ATTEMPTS,
                        started.elapsed().as_millis(),
                        e
                    );
                    self.events.on_event(LoadEvent::InsertRetried {
                        worker: self.worker,
                        attempt,
                        error: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }

        // Retry budget exhausted: the batch is lost. The caller's counters
        // stay untouched, which undercounts throughput instead of aborting.
        let elapsed = started.elapsed();
        let error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown insert error".to_string());
        log::error!(
            "worker {}: batch lost after {} attempts in {} ms: {}",
            self.worker,
            INSERT_ATTEMPTS,
            elapsed.as_millis(),
            error
        );
        self.events.on_event(LoadEvent::BatchLost {
            worker: self.worker,
            attempts: INSERT_ATTEMPTS,
            elapsed_ms: elapsed.as_millis() as u64,
            error,
        });
        load_metrics::record_batch_lost(elapsed);
        Ok((0, 0))
    }

    /// Closes the worker's session. Called once, after the worker's stream of
    /// batches is exhausted.
    pub fn finish(mut self) -> Result<(), LoadError> {
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;
    use crate::client::QueryCursor;
    use crate::telemetry::noop_event_listener;
    use std::sync::Mutex;

    /// Records every insert and fails the first `fail_first` attempts.
    #[derive(Debug, Default)]
    struct ScriptedStore {
        fail_first: u32,
        attempts: Arc<Mutex<u32>>,
        inserted_paths: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl ColumnStore for ScriptedStore {
        fn insert_columns(&mut self, request: &ColumnInsert<'_>) -> Result<(), LoadError> {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            if *attempts <= self.fail_first {
                return Err(LoadError::Insert("connection reset".to_string()));
            }
            self.inserted_paths
                .lock()
                .unwrap()
                .push(request.paths.to_vec());
            Ok(())
        }

        fn execute_query(&mut self, _query: &str) -> Result<QueryCursor, LoadError> {
            Ok(QueryCursor::default())
        }

        fn close(&mut self) -> Result<(), LoadError> {
            Ok(())
        }
    }

    fn batch_of(lines: &[&str]) -> Batch {
        let pool = BufferPool::new(1024, 2);
        let mut buf = pool.acquire();
        let mut metrics = 0u64;
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
            metrics += line.split(' ').nth(1).map(|f| f.split(',').count()).unwrap_or(0) as u64;
        }
        Batch {
            buf,
            metrics,
            rows: lines.len() as u64,
        }
    }

    fn driver_with(store: ScriptedStore, do_load: bool) -> InsertDriver {
        InsertDriver::new(Box::new(store), noop_event_listener(), 0, do_load)
    }

    #[test]
    fn successful_batch_passes_counts_through() {
        let store = ScriptedStore::default();
        let attempts = store.attempts.clone();
        let inserted = store.inserted_paths.clone();
        let mut driver = driver_with(store, true);

        let batch = batch_of(&[
            "type,name=truck_1,fleet=east fuel=0.5,load=10 1000000000",
            "type,name=truck_1,fleet=east fuel=0.6 2000000000",
        ]);
        let (metrics, rows) = driver.process_batch(&batch).unwrap();
        assert_eq!((metrics, rows), (3, 2));
        assert_eq!(*attempts.lock().unwrap(), 1);

        let inserted = inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(
            inserted[0],
            vec![
                "type.truck_0001.east.unknown.unknown.unknown.fuel",
                "type.truck_0001.east.unknown.unknown.unknown.load",
            ]
        );
    }

    #[test]
    fn transient_failure_is_retried_to_success() {
        let store = ScriptedStore {
            fail_first: 2,
            ..Default::default()
        };
        let attempts = store.attempts.clone();
        let mut driver = driver_with(store, true);

        let batch = batch_of(&["type,name=truck_1 fuel=0.5 1000"]);
        let (metrics, rows) = driver.process_batch(&batch).unwrap();
        assert_eq!((metrics, rows), (1, 1));
        assert_eq!(*attempts.lock().unwrap(), 3);
    }

    #[test]
    fn exhausted_retries_report_zero_counts() {
        let store = ScriptedStore {
            fail_first: u32::MAX,
            ..Default::default()
        };
        let attempts = store.attempts.clone();
        let mut driver = driver_with(store, true);

        let batch = batch_of(&["type,name=truck_1 fuel=0.5 1000"]);
        let result = driver.process_batch(&batch);
        assert!(result.is_ok(), "a lost batch must not stop the worker");
        assert_eq!(result.unwrap(), (0, 0));
        assert_eq!(
            *attempts.lock().unwrap(),
            INSERT_ATTEMPTS,
            "insert must be attempted exactly {} times",
            INSERT_ATTEMPTS
        );
    }

    #[test]
    fn malformed_batch_fails_before_any_insert() {
        let store = ScriptedStore::default();
        let attempts = store.attempts.clone();
        let mut driver = driver_with(store, true);

        let batch = batch_of(&["type,name=truck_1 fuel=not-a-number 1000"]);
        assert!(driver.process_batch(&batch).is_err());
        assert_eq!(*attempts.lock().unwrap(), 0);
    }

    #[test]
    fn do_load_disabled_skips_the_store() {
        let store = ScriptedStore::default();
        let attempts = store.attempts.clone();
        let mut driver = driver_with(store, false);

        let batch = batch_of(&["type,name=truck_1 fuel=0.5 1000"]);
        assert_eq!(driver.process_batch(&batch).unwrap(), (0, 0));
        assert_eq!(*attempts.lock().unwrap(), 0);
    }

    #[test]
    fn empty_batch_skips_the_store_and_keeps_counts() {
        let store = ScriptedStore::default();
        let attempts = store.attempts.clone();
        let mut driver = driver_with(store, true);

        let batch = batch_of(&[]);
        assert_eq!(driver.process_batch(&batch).unwrap(), (0, 0));
        assert_eq!(*attempts.lock().unwrap(), 0);
    }
}
