//! Storage client boundary. The loader talks to the target store through the
//! [`ColumnStore`] trait: one bulk column-insert per batch plus the session
//! lifecycle and a read-path query entry point. A [`StoreConnector`] opens one
//! session per worker from a shuffled endpoint list, so sessions spread across
//! a cluster without any shared mutable state.

use crate::error::LoadError;
use crate::matrix::ValueMatrix;
use crate::types::{TagSet, Timestamp, Value};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Declared storage type of an inserted column. Every loaded value is typed
/// double precision regardless of the 32-bit source parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Double,
}

/// One bulk column-insert request: paths and timestamps ordered by ordinal,
/// the path-major value matrix, one declared type per path, and one tag
/// metadata set per path.
#[derive(Debug)]
pub struct ColumnInsert<'a> {
    pub paths: &'a [String],
    pub timestamps: &'a [Timestamp],
    pub values: &'a ValueMatrix,
    pub data_types: &'a [DataType],
    pub tags: &'a [TagSet],
}

/// An open session against the target store. Sessions are strictly
/// per-worker: opened once at worker start, closed once at worker end, never
/// shared, so implementations need no interior locking.
pub trait ColumnStore: Send {
    /// Bulk column insert. Blocking; one call per attempt.
    fn insert_columns(&mut self, request: &ColumnInsert<'_>) -> Result<(), LoadError>;

    /// Executes a read query, returning a row cursor. Used by the read-path
    /// benchmark, not by the load path.
    fn execute_query(&mut self, query: &str) -> Result<QueryCursor, LoadError>;

    /// Closes the session.
    fn close(&mut self) -> Result<(), LoadError>;
}

/// Opens sessions for workers. Implementations receive the worker's already
/// shuffled endpoint list and may pick any ordering strategy over it.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, endpoints: &[String]) -> Result<Box<dyn ColumnStore>, LoadError>;
}

/// Materialized result rows for one query.
#[derive(Debug, Default)]
pub struct QueryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
    pos: usize,
}

impl QueryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Self {
        QueryCursor {
            columns,
            rows,
            pos: 0,
        }
    }

    /// Result column names, in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Advances the cursor, returning the next row or `None` when exhausted.
    pub fn next_row(&mut self) -> Option<&[Option<Value>]> {
        if self.pos >= self.rows.len() {
            return None;
        }
        self.pos += 1;
        Some(&self.rows[self.pos - 1])
    }
}

/// Returns the endpoint list in a per-worker random order. Seeded so a run
/// with a fixed seed places sessions reproducibly.
pub fn shuffled_endpoints(endpoints: &[String], seed: u64) -> Vec<String> {
    let mut shuffled = endpoints.to_vec();
    let mut rng = SmallRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);
    shuffled
}

/// Accepts and drops every insert. Backs read-speed measurement runs and
/// tests; a real store implements [`ColumnStore`] against its wire client.
#[derive(Debug, Default)]
pub struct DiscardStore;

impl ColumnStore for DiscardStore {
    fn insert_columns(&mut self, _request: &ColumnInsert<'_>) -> Result<(), LoadError> {
        Ok(())
    }

    fn execute_query(&mut self, _query: &str) -> Result<QueryCursor, LoadError> {
        Ok(QueryCursor::default())
    }

    fn close(&mut self) -> Result<(), LoadError> {
        Ok(())
    }
}

/// Connector for [`DiscardStore`] sessions.
#[derive(Debug, Default, Clone)]
pub struct DiscardConnector;

impl StoreConnector for DiscardConnector {
    fn connect(&self, _endpoints: &[String]) -> Result<Box<dyn ColumnStore>, LoadError> {
        Ok(Box::new(DiscardStore))
    }
}
