//! Run orchestration: main API, worker pool, dispatch, and the periodic
//! throughput reporter. Batches are dispatched round-robin over bounded
//! per-worker channels, so each worker sees a private sequential stream and
//! the channels provide backpressure against a slow store.

use crate::buffer::BufferPool;
use crate::client::{shuffled_endpoints, StoreConnector};
use crate::driver::InsertDriver;
use crate::error::LoadError;
use crate::source::LineBatcher;
use crate::telemetry::{noop_event_listener, LoadEvent, LoadEventListener};
use crate::types::Batch;
use crate::DEFAULT_BUFFER_CAPACITY;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Configuration options for one load run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Number of parallel workers, each with its own storage session.
    pub workers: usize,
    /// Number of rows grouped into a single bulk insert.
    pub batch_size: usize,
    /// Total number of rows to load (None = all of them).
    pub limit: Option<u64>,
    /// Whether to write data. False turns the run into a read-speed check.
    pub do_load: bool,
    /// Capacity of each worker's batch channel.
    pub channel_capacity: usize,
    /// Interval between throughput reports. Zero disables the reporter.
    pub reporting_interval: Duration,
    /// Storage endpoints; each worker shuffles its own copy at start.
    pub endpoints: Vec<String>,
    /// PRNG seed for endpoint shuffling (None or 0 = derive from the clock).
    pub seed: Option<u64>,
    /// Capacity of one pooled line buffer.
    pub buffer_capacity: usize,
    /// Structured event hook for observability (no-op by default).
    pub event_listener: Arc<dyn LoadEventListener>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            workers: 1,
            batch_size: 10,
            limit: None,
            do_load: true,
            channel_capacity: 64,
            reporting_interval: Duration::from_secs(10),
            endpoints: Vec::new(),
            seed: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            event_listener: noop_event_listener(),
        }
    }
}

/// Totals for one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    /// Metric values written (lost batches excluded).
    pub metrics: u64,
    /// Rows written (lost batches excluded).
    pub rows: u64,
    /// Batches processed, written or lost.
    pub batches: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl LoadSummary {
    /// Metric values per second over the whole run.
    pub fn metrics_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.metrics as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs a full load: reads `reader` into batches, fans them out to a fixed
/// pool of workers, and returns the totals. The first malformed line (or any
/// session-open failure) aborts the run with its error; lost batches do not.
pub fn run_load(
    config: &LoadConfig,
    reader: impl BufRead,
    connector: Arc<dyn StoreConnector>,
) -> Result<LoadSummary, LoadError> {
    if config.workers == 0 {
        return Err(LoadError::Config("workers must be at least 1".to_string()));
    }
    if config.batch_size == 0 {
        return Err(LoadError::Config(
            "batch_size must be at least 1".to_string(),
        ));
    }

    let started = Instant::now();
    let pool = BufferPool::new(config.buffer_capacity, config.workers * 4);
    let totals = Arc::new(RunTotals::default());
    let base_seed = match config.seed {
        Some(seed) if seed != 0 => seed,
        _ => clock_seed(),
    };

    // One bounded channel per worker: a private sequential stream of batches.
    let mut senders: Vec<mpsc::SyncSender<Batch>> = Vec::with_capacity(config.workers);
    let mut handles: Vec<JoinHandle<Result<(), LoadError>>> = Vec::with_capacity(config.workers);
    for id in 0..config.workers {
        let (tx, rx) = mpsc::sync_channel::<Batch>(config.channel_capacity);
        senders.push(tx);

        let connector = Arc::clone(&connector);
        let events = Arc::clone(&config.event_listener);
        let totals = Arc::clone(&totals);
        let endpoints = config.endpoints.clone();
        let do_load = config.do_load;
        let seed = base_seed.wrapping_add(id as u64);

        let handle = thread::Builder::new()
            .name(format!("tsload-worker-{}", id))
            .spawn(move || -> Result<(), LoadError> {
                events.on_event(LoadEvent::WorkerStarted { worker: id });

                let endpoints = shuffled_endpoints(&endpoints, seed);
                let store = connector.connect(&endpoints)?;
                events.on_event(LoadEvent::SessionOpened { worker: id });

                let mut driver = InsertDriver::new(store, Arc::clone(&events), id, do_load);
                for batch in rx {
                    let (metrics, rows) = driver.process_batch(&batch)?;
                    totals.metrics.fetch_add(metrics, Ordering::Relaxed);
                    totals.rows.fetch_add(rows, Ordering::Relaxed);
                    totals.batches.fetch_add(1, Ordering::Relaxed);
                    // `batch` drops here, returning its buffer to the pool.
                }

                driver.finish()?;
                events.on_event(LoadEvent::SessionClosed { worker: id });
                events.on_event(LoadEvent::WorkerStopping { worker: id });
                Ok(())
            })?;
        handles.push(handle);
    }

    let reporter = spawn_reporter(config.reporting_interval, Arc::clone(&totals));

    // Dispatch until the source runs dry or a worker stops accepting; a dead
    // worker's error is picked up at join time.
    let mut batcher = LineBatcher::new(reader, pool, config.batch_size, config.limit);
    let dispatch_result: Result<(), LoadError> = (|| {
        let mut next_worker = 0usize;
        while let Some(batch) = batcher.next_batch()? {
            if senders[next_worker % config.workers].send(batch).is_err() {
                break;
            }
            next_worker += 1;
        }
        Ok(())
    })();

    // Closing the channels lets every worker drain, close its session, exit.
    drop(senders);

    let mut first_error = dispatch_result.err();
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(_) => {
                first_error
                    .get_or_insert_with(|| LoadError::Internal("worker thread panicked".to_string()));
            }
        }
    }

    if let Some(reporter) = reporter {
        reporter.stop();
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    Ok(LoadSummary {
        metrics: totals.metrics.load(Ordering::Relaxed),
        rows: totals.rows.load(Ordering::Relaxed),
        batches: totals.batches.load(Ordering::Relaxed),
        elapsed: started.elapsed(),
    })
}

#[derive(Debug, Default)]
struct RunTotals {
    metrics: AtomicU64,
    rows: AtomicU64,
    batches: AtomicU64,
}

/// Periodic throughput reporter. Logs cumulative totals until stopped.
struct Reporter {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Reporter {
    fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn spawn_reporter(interval: Duration, totals: Arc<RunTotals>) -> Option<Reporter> {
    if interval.is_zero() {
        return None;
    }
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);
    let handle = thread::Builder::new()
        .name("tsload-reporter".to_string())
        .spawn(move || {
            // Sleep in short slices so stopping does not wait a full interval.
            let slice = Duration::from_millis(50).min(interval);
            let mut next_report = Instant::now() + interval;
            while !stop_clone.load(Ordering::Relaxed) {
                thread::sleep(slice);
                if Instant::now() >= next_report {
                    log::info!(
                        "progress: {} metrics, {} rows, {} batches",
                        totals.metrics.load(Ordering::Relaxed),
                        totals.rows.load(Ordering::Relaxed),
                        totals.batches.load(Ordering::Relaxed)
                    );
                    next_report = Instant::now() + interval;
                }
            }
        })
        .ok()?;
    Some(Reporter {
        stop,
        handle: Some(handle),
    })
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
