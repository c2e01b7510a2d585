#![doc = include_str!("../README.md")]
// Declare modules
pub mod buffer;
pub mod client;
pub mod driver;
pub mod error;
pub mod index;
pub mod matrix;
pub mod parse;
pub mod path;
pub mod runner;
pub mod source;
pub mod telemetry;
pub mod types;

/// Reusable pool of raw-line buffers shared by the batching layer.
pub use crate::buffer::BufferPool;
/// Storage client boundary: bulk column-insert and session lifecycle.
pub use crate::client::{ColumnInsert, ColumnStore, DataType, QueryCursor, StoreConnector};
/// Per-worker driver: two-pass batch assembly plus bounded-retry insertion.
pub use crate::driver::{InsertDriver, INSERT_ATTEMPTS};
/// Error type for loader operations.
pub use crate::error::LoadError;
/// Main entry point: run a full load over a line source with a worker pool.
pub use crate::runner::{run_load, LoadConfig, LoadSummary};
/// Structured event hook for observability.
pub use crate::telemetry::{LoadEvent, LoadEventListener};
/// Core data types shared across the pipeline.
pub use crate::types::{Batch, TagSet, Timestamp, Value};

/// Default capacity of one pooled line buffer (4 MiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024 * 1024;
