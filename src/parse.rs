//! Record parsing: one raw line into canonical paths, parsed field values,
//! leftover tag metadata, and the raw timestamp.
//!
//! Wire format, one record per line:
//!
//! ```text
//! devicetype[,tag=value]* field=value[,field=value]* timestamp
//! ```
//!
//! Malformed input is never skipped: a wrong segment count or an unparsable
//! numeric desynchronizes the batch counters, so both are hard errors.

use crate::error::LoadError;
use crate::path::PathPrefix;
use crate::types::{TagSet, Timestamp, Value};

/// Tag key carrying the entity identifier within the measurement segment.
const ENTITY_TAG: &str = "name";

/// One fully parsed record. `paths` and `values` are index-aligned: the
/// record contributes `values[i]` at `paths[i]` for `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub paths: Vec<String>,
    pub values: Vec<Value>,
    /// Tags that did not become path components; shared by all of the
    /// record's paths.
    pub tags: TagSet,
    pub timestamp: Timestamp,
}

/// Parses one raw line. Errors on anything other than exactly three
/// space-separated segments, a present device-type token, well-formed
/// `key=value` assignments, numeric field values, and an integer timestamp.
pub fn parse_line(line: &str) -> Result<ParsedLine, LoadError> {
    let mut segments = line.split(' ');
    let (measurement, fields, timestamp_raw) =
        match (segments.next(), segments.next(), segments.next()) {
            (Some(m), Some(f), Some(t)) => (m, f, t),
            _ => return Err(malformed(line, "expected three space-separated segments")),
        };
    if segments.next().is_some() {
        return Err(malformed(line, "expected three space-separated segments"));
    }

    let mut measurement_parts = measurement.split(',');
    let device_type = measurement_parts.next().unwrap_or("");
    if device_type.is_empty() {
        return Err(malformed(line, "missing device type token"));
    }

    let mut entity = None;
    let mut tags: Vec<(String, String)> = Vec::new();
    for assignment in measurement_parts {
        let (key, value) = split_assignment(line, assignment)?;
        if key == ENTITY_TAG && entity.is_none() {
            entity = Some(value);
        } else {
            tags.push((key.to_string(), value.to_string()));
        }
    }

    let prefix = PathPrefix::new(device_type, entity, &tags);

    let mut paths = Vec::new();
    let mut values = Vec::new();
    for assignment in fields.split(',') {
        let (field, raw) = split_assignment(line, assignment)?;
        // 32-bit parse, widened for storage.
        let value: f32 = raw.parse().map_err(|source| LoadError::InvalidFieldValue {
            field: field.to_string(),
            value: raw.to_string(),
            source,
        })?;
        paths.push(prefix.path_for(field));
        values.push(value as Value);
    }

    let timestamp: Timestamp =
        timestamp_raw
            .parse()
            .map_err(|source| LoadError::InvalidTimestamp {
                value: timestamp_raw.to_string(),
                source,
            })?;

    Ok(ParsedLine {
        paths,
        values,
        tags: prefix.into_leftover(),
        timestamp,
    })
}

fn split_assignment<'a>(line: &str, assignment: &'a str) -> Result<(&'a str, &'a str), LoadError> {
    assignment
        .split_once('=')
        .ok_or_else(|| malformed(line, &format!("assignment {:?} is not key=value", assignment)))
}

fn malformed(line: &str, details: &str) -> LoadError {
    LoadError::MalformedLine {
        line: line.to_string(),
        details: details.to_string(),
    }
}
