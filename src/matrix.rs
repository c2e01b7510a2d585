//! Dense value matrix: the second pass over a batch. The matrix is allocated
//! only after the index pass because its dimensions are the unique path and
//! timestamp counts; cells never observed keep the explicit absent marker so
//! the store can tell "missing" from a legitimate zero.

use crate::error::LoadError;
use crate::index::BatchIndex;
use crate::parse::parse_line;
use crate::types::Value;

/// Path-major dense matrix of optional values. Row = path ordinal,
/// column = timestamp ordinal, `None` = absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Value>>,
}

impl ValueMatrix {
    /// Allocates a `rows` × `cols` matrix with every cell absent.
    pub fn absent(rows: usize, cols: usize) -> Self {
        ValueMatrix {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// Writes one cell. Duplicate writes are last-write-wins.
    pub fn set(&mut self, row: usize, col: usize, value: Value) {
        self.cells[row * self.cols + col] = Some(value);
    }

    /// Reads one cell; `None` means no value was recorded.
    pub fn get(&self, row: usize, col: usize) -> Option<Value> {
        self.cells[row * self.cols + col]
    }

    /// One path's values across all timestamp ordinals.
    pub fn row(&self, row: usize) -> &[Option<Value>] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

/// Fills a matrix from a second forward pass over the batch's lines. Every
/// ordinal looked up here was registered by the index pass; a miss is an
/// internal invariant violation, not an input error.
pub fn fill_matrix<'a>(
    index: &BatchIndex,
    lines: impl Iterator<Item = &'a str>,
) -> Result<ValueMatrix, LoadError> {
    let mut matrix = ValueMatrix::absent(index.path_count(), index.timestamp_count());
    for line in lines {
        let parsed = parse_line(line)?;
        let col = index.timestamp_ordinal(parsed.timestamp).ok_or_else(|| {
            LoadError::Internal(format!(
                "timestamp {} missing from batch index",
                parsed.timestamp
            ))
        })?;
        for (path, value) in parsed.paths.iter().zip(parsed.values.iter()) {
            let row = index
                .path_ordinal(path)
                .ok_or_else(|| LoadError::Internal(format!("path {} missing from batch index", path)))?;
            matrix.set(row, col, *value);
        }
    }
    Ok(matrix)
}
