use std::sync::Arc;
use std::time::Duration;

/// Structured, in-process event hook for observability.
///
/// This crate is a library; emitting logs directly (e.g. `println!`) is not
/// acceptable for production. Callers can provide an implementation that
/// forwards these events to `tracing`, `log`, metrics, or custom sinks.
pub trait LoadEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: LoadEvent);
}

/// Structured events emitted by the loader core.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    WorkerStarted { worker: usize },
    WorkerStopping { worker: usize },

    SessionOpened { worker: usize },
    SessionClosed { worker: usize },

    InsertSucceeded {
        worker: usize,
        attempt: u32,
        elapsed_ms: u64,
        paths: usize,
        timestamps: usize,
    },
    InsertRetried {
        worker: usize,
        attempt: u32,
        error: String,
    },
    BatchLost {
        worker: usize,
        attempts: u32,
        elapsed_ms: u64,
        error: String,
    },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl LoadEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: LoadEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn LoadEventListener> {
    Arc::new(NoopEventListener)
}

/// Production-grade metrics instrumentation and in-process scraping.
///
/// ## Key properties
/// - Library-safe: emitting metrics is effectively a no-op until a recorder is installed.
/// - Serverless scraping: callers can render Prometheus exposition text in-process.
/// - Low operational overhead: a lightweight upkeep thread is spawned to keep histograms bounded.
pub mod load_metrics {
    use super::*;

    use ::metrics::{describe_counter, describe_histogram, Unit};

    #[cfg(feature = "prometheus")]
    use std::sync::atomic::{AtomicBool, Ordering};
    #[cfg(feature = "prometheus")]
    use std::sync::Mutex;
    #[cfg(feature = "prometheus")]
    use std::thread::JoinHandle;

    #[cfg(feature = "prometheus")]
    use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

    // --- metric names ---
    //
    // Notes:
    // - Counters are exposed as `<name>_total` by the Prometheus exporter.
    // - Histograms are exposed as `<name>_bucket`, `<name>_sum`, `<name>_count`.

    pub const BATCHES_WRITTEN: &str = "tsload_batches_written";
    pub const BATCHES_LOST: &str = "tsload_batches_lost";
    pub const METRICS_WRITTEN: &str = "tsload_metrics_written";
    pub const ROWS_WRITTEN: &str = "tsload_rows_written";
    pub const INSERT_DURATION_SECONDS: &str = "tsload_insert_duration_seconds";

    /// Handle to the in-process Prometheus recorder/scrape renderer.
    ///
    /// This does **not** start an HTTP server. Call [`InProcessPrometheus::render`] to scrape.
    #[cfg(feature = "prometheus")]
    #[derive(Debug)]
    pub struct InProcessPrometheus {
        handle: PrometheusHandle,
        stop: Arc<AtomicBool>,
        upkeep_thread: Mutex<Option<JoinHandle<()>>>,
    }

    #[cfg(feature = "prometheus")]
    impl InProcessPrometheus {
        /// Installs a global Prometheus recorder (once per process) and starts a small upkeep thread.
        ///
        /// The upkeep thread periodically calls `run_upkeep()` to keep exporter internals healthy
        /// (e.g. histogram maintenance). This is required when using `install_recorder`.
        pub fn install(upkeep_interval: Duration) -> Result<Self, MetricsInitError> {
            describe_all();

            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .map_err(MetricsInitError::from_build_error)?;

            let stop = Arc::new(AtomicBool::new(false));
            let stop_clone = stop.clone();
            let handle_clone = handle.clone();
            let upkeep_thread = std::thread::Builder::new()
                .name("tsload-metrics-upkeep".to_string())
                .spawn(move || {
                    while !stop_clone.load(Ordering::Relaxed) {
                        std::thread::sleep(upkeep_interval);
                        handle_clone.run_upkeep();
                    }
                })
                .map_err(|e| MetricsInitError::ThreadSpawn(e.to_string()))?;

            Ok(Self {
                handle,
                stop,
                upkeep_thread: Mutex::new(Some(upkeep_thread)),
            })
        }

        /// Renders the current metrics in the Prometheus text exposition format.
        pub fn render(&self) -> String {
            self.handle.render()
        }
    }

    #[cfg(feature = "prometheus")]
    impl Drop for InProcessPrometheus {
        fn drop(&mut self) {
            self.stop.store(true, Ordering::Relaxed);
            if let Ok(mut guard) = self.upkeep_thread.lock() {
                if let Some(t) = guard.take() {
                    let _ = t.join();
                }
            }
        }
    }

    #[cfg(feature = "prometheus")]
    #[derive(Debug, thiserror::Error)]
    pub enum MetricsInitError {
        #[error("metrics recorder already installed")]
        AlreadyInstalled,
        #[error("failed to install prometheus recorder: {0}")]
        Install(String),
        #[error("failed to spawn upkeep thread: {0}")]
        ThreadSpawn(String),
    }

    #[cfg(feature = "prometheus")]
    impl MetricsInitError {
        fn from_build_error(e: BuildError) -> Self {
            match e {
                BuildError::FailedToSetGlobalRecorder(_) => MetricsInitError::AlreadyInstalled,
                other => MetricsInitError::Install(other.to_string()),
            }
        }
    }

    #[inline]
    pub fn record_insert(duration: Duration, metrics: u64, rows: u64) {
        ::metrics::histogram!(INSERT_DURATION_SECONDS).record(duration.as_secs_f64());
        ::metrics::counter!(BATCHES_WRITTEN).increment(1);
        if metrics > 0 {
            ::metrics::counter!(METRICS_WRITTEN).increment(metrics);
        }
        if rows > 0 {
            ::metrics::counter!(ROWS_WRITTEN).increment(rows);
        }
    }

    #[inline]
    pub fn record_batch_lost(duration: Duration) {
        ::metrics::histogram!(INSERT_DURATION_SECONDS).record(duration.as_secs_f64());
        ::metrics::counter!(BATCHES_LOST).increment(1);
    }

    /// Registers names, units, and help text for every loader metric with the
    /// installed recorder. `InProcessPrometheus::install` calls this; callers
    /// installing their own recorder can invoke it directly.
    pub fn describe_all() {
        // Counters
        describe_counter!(
            BATCHES_WRITTEN,
            Unit::Count,
            "Total number of batches written by bulk column inserts."
        );
        describe_counter!(
            BATCHES_LOST,
            Unit::Count,
            "Total number of batches dropped after exhausting the insert retry budget."
        );
        describe_counter!(
            METRICS_WRITTEN,
            Unit::Count,
            "Total number of metric values written."
        );
        describe_counter!(
            ROWS_WRITTEN,
            Unit::Count,
            "Total number of rows written."
        );

        // Histograms
        describe_histogram!(
            INSERT_DURATION_SECONDS,
            Unit::Seconds,
            "Wall-clock duration of one batch's insert, across all of its attempts."
        );
    }
}
