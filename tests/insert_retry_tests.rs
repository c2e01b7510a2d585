use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tsload::client::{ColumnInsert, ColumnStore, QueryCursor, StoreConnector};
use tsload::driver::INSERT_ATTEMPTS;
use tsload::error::LoadError;
use tsload::runner::{run_load, LoadConfig};
use tsload::telemetry::{LoadEvent, LoadEventListener};

/// Fails the first `fail_first` insert attempts across the whole run, then
/// succeeds forever.
#[derive(Debug)]
struct FlakyStore {
    attempts: Arc<AtomicU32>,
    fail_first: u32,
}

impl ColumnStore for FlakyStore {
    fn insert_columns(&mut self, _request: &ColumnInsert<'_>) -> Result<(), LoadError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            Err(LoadError::Insert(format!("simulated failure {}", attempt)))
        } else {
            Ok(())
        }
    }

    fn execute_query(&mut self, _query: &str) -> Result<QueryCursor, LoadError> {
        Ok(QueryCursor::default())
    }

    fn close(&mut self) -> Result<(), LoadError> {
        Ok(())
    }
}

#[derive(Debug)]
struct FlakyConnector {
    attempts: Arc<AtomicU32>,
    fail_first: u32,
}

impl StoreConnector for FlakyConnector {
    fn connect(&self, _endpoints: &[String]) -> Result<Box<dyn ColumnStore>, LoadError> {
        Ok(Box::new(FlakyStore {
            attempts: Arc::clone(&self.attempts),
            fail_first: self.fail_first,
        }))
    }
}

/// Collects every event the run emits.
#[derive(Debug, Default)]
struct CollectingListener {
    events: Mutex<Vec<LoadEvent>>,
}

impl LoadEventListener for CollectingListener {
    fn on_event(&self, event: LoadEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn flaky_setup(fail_first: u32) -> (Arc<FlakyConnector>, Arc<AtomicU32>) {
    let attempts = Arc::new(AtomicU32::new(0));
    let connector = Arc::new(FlakyConnector {
        attempts: Arc::clone(&attempts),
        fail_first,
    });
    (connector, attempts)
}

fn config_with_listener(listener: Arc<dyn LoadEventListener>) -> LoadConfig {
    LoadConfig {
        workers: 1,
        batch_size: 1,
        reporting_interval: Duration::ZERO,
        seed: Some(1),
        event_listener: listener,
        ..Default::default()
    }
}

fn config() -> LoadConfig {
    LoadConfig {
        workers: 1,
        batch_size: 1,
        reporting_interval: Duration::ZERO,
        seed: Some(1),
        ..Default::default()
    }
}

const ONE_LINE: &str = "type,name=truck_1,fleet=east fuel=0.5 1000000000\n";

#[test]
fn transient_failures_retry_to_success() {
    let (connector, attempts) = flaky_setup(INSERT_ATTEMPTS - 1);
    let summary = run_load(&config(), ONE_LINE.as_bytes(), connector).unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), INSERT_ATTEMPTS);
    assert_eq!(summary.metrics, 1, "retried batch still counts in full");
    assert_eq!(summary.rows, 1);
}

#[test]
fn failing_batch_is_attempted_exactly_three_times() {
    let (connector, attempts) = flaky_setup(u32::MAX);
    let summary = run_load(&config(), ONE_LINE.as_bytes(), connector).unwrap();

    assert_eq!(
        attempts.load(Ordering::SeqCst),
        3,
        "retry budget is exactly 3 attempts, never more"
    );
    assert_eq!((summary.metrics, summary.rows), (0, 0));
    assert_eq!(summary.batches, 1);
}

#[test]
fn lost_batch_does_not_stop_the_worker() {
    // The first batch burns its entire budget; the second succeeds at once.
    let (connector, attempts) = flaky_setup(INSERT_ATTEMPTS);
    let data = format!("{}{}", ONE_LINE, "type,name=truck_2,fleet=west load=10 2000000000\n");
    let summary = run_load(&config(), data.as_bytes(), connector).unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), INSERT_ATTEMPTS + 1);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.metrics, 1, "only the second batch's metrics count");
    assert_eq!(summary.rows, 1);
}

#[test]
fn events_trace_retries_and_loss() {
    let listener = Arc::new(CollectingListener::default());
    let (connector, _attempts) = flaky_setup(u32::MAX);
    run_load(
        &config_with_listener(listener.clone()),
        ONE_LINE.as_bytes(),
        connector,
    )
    .unwrap();

    let events = listener.events.lock().unwrap();
    let retried = events
        .iter()
        .filter(|e| matches!(e, LoadEvent::InsertRetried { .. }))
        .count();
    let lost: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            LoadEvent::BatchLost { attempts, .. } => Some(*attempts),
            _ => None,
        })
        .collect();
    assert_eq!(retried, INSERT_ATTEMPTS as usize);
    assert_eq!(lost, vec![INSERT_ATTEMPTS]);
}

#[test]
fn events_trace_worker_and_session_lifecycle() {
    let listener = Arc::new(CollectingListener::default());
    let (connector, _attempts) = flaky_setup(0);
    run_load(
        &config_with_listener(listener.clone()),
        ONE_LINE.as_bytes(),
        connector,
    )
    .unwrap();

    let events = listener.events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::WorkerStarted { worker: 0 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::SessionOpened { worker: 0 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::InsertSucceeded { attempt: 1, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::SessionClosed { worker: 0 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::WorkerStopping { worker: 0 })));
}

#[test]
fn session_open_failure_aborts_the_run() {
    #[derive(Debug)]
    struct RefusingConnector;
    impl StoreConnector for RefusingConnector {
        fn connect(&self, _endpoints: &[String]) -> Result<Box<dyn ColumnStore>, LoadError> {
            Err(LoadError::Session("no route to host".to_string()))
        }
    }

    let result = run_load(&config(), ONE_LINE.as_bytes(), Arc::new(RefusingConnector));
    assert!(matches!(result, Err(LoadError::Session(_))));
}
