//! Batch indexing: the first of the two passes over a batch. Assigns stable
//! zero-based ordinals to every unique canonical path and every unique
//! timestamp, in first-seen order. Ordinals are batch-local; nothing here
//! survives past one batch.

use crate::error::LoadError;
use crate::parse::parse_line;
use crate::types::{TagSet, Timestamp};
use std::collections::HashMap;

/// Path and timestamp ordinals for one batch, plus the tag metadata captured
/// when each path was first registered.
#[derive(Debug, Default)]
pub struct BatchIndex {
    paths: Vec<String>,
    path_ordinals: HashMap<String, usize>,
    path_tags: Vec<TagSet>,
    timestamps: Vec<Timestamp>,
    timestamp_ordinals: HashMap<Timestamp, usize>,
}

impl BatchIndex {
    /// Builds the index with a single forward pass over the batch's lines.
    /// Paths seen in multiple lines collapse to one ordinal. O(L·F) with
    /// amortized constant-time lookups on both maps.
    pub fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self, LoadError> {
        let mut index = BatchIndex::default();
        for line in lines {
            let parsed = parse_line(line)?;
            for path in parsed.paths {
                index.register_path(path, &parsed.tags);
            }
            index.register_timestamp(parsed.timestamp);
        }
        Ok(index)
    }

    fn register_path(&mut self, path: String, tags: &TagSet) {
        if self.path_ordinals.contains_key(&path) {
            return;
        }
        self.path_ordinals.insert(path.clone(), self.paths.len());
        self.paths.push(path);
        // First registration wins, consistent with first-seen ordinals.
        self.path_tags.push(tags.clone());
    }

    fn register_timestamp(&mut self, timestamp: Timestamp) {
        if self.timestamp_ordinals.contains_key(&timestamp) {
            return;
        }
        self.timestamp_ordinals
            .insert(timestamp, self.timestamps.len());
        self.timestamps.push(timestamp);
    }

    /// Ordinal of a canonical path, if the batch contains it.
    pub fn path_ordinal(&self, path: &str) -> Option<usize> {
        self.path_ordinals.get(path).copied()
    }

    /// Ordinal of a raw timestamp, if the batch contains it.
    pub fn timestamp_ordinal(&self, timestamp: Timestamp) -> Option<usize> {
        self.timestamp_ordinals.get(&timestamp).copied()
    }

    /// Unique canonical paths, ordered by ordinal.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Unique timestamps, ordered by ordinal.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Per-path tag metadata, ordered by path ordinal.
    pub fn path_tags(&self) -> &[TagSet] {
        &self.path_tags
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn timestamp_count(&self) -> usize {
        self.timestamps.len()
    }

    /// True when the batch contributed no paths at all.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
