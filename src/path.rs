//! Canonical hierarchical path construction. A path names one measurable
//! field inside its full tag context: device type, entity identifier, the
//! fixed tag categories, and finally the field name, dot-joined.

use crate::types::TagSet;

/// Tag categories, in the order they appear in a canonical path. A record
/// that does not supply a category gets [`UNKNOWN_COMPONENT`] in its place.
pub const TAG_CATEGORIES: [&str; 4] = ["fleet", "driver", "model", "device_version"];

/// Fallback literal for the entity identifier and any unsupplied tag category.
pub const UNKNOWN_COMPONENT: &str = "unknown";

/// Rewrites hyphens and dots inside one path component to underscores. A dot
/// inside a component would otherwise corrupt the path hierarchy. The rewrite
/// is idempotent.
pub fn sanitize_component(raw: &str) -> String {
    raw.replace(['-', '.'], "_")
}

/// Renders an entity identifier like `truck_1` as `truck_0001`: the trailing
/// numeric index is re-rendered as a fixed 4-digit zero-padded decimal so the
/// canonical form sorts and globs predictably. Identifiers without a numeric
/// suffix are passed through sanitized.
pub fn format_entity(raw: &str) -> String {
    match raw.rsplit_once('_') {
        Some((name, index)) => match index.parse::<u64>() {
            Ok(n) => format!("{}_{:04}", sanitize_component(name), n),
            Err(_) => sanitize_component(raw),
        },
        None => sanitize_component(raw),
    }
}

/// The path prefix shared by every field of one record: device type, entity,
/// and the four tag categories, already sanitized and dot-joined. Built once
/// per record, then stamped with each field name.
#[derive(Debug, Clone)]
pub struct PathPrefix {
    joined: String,
    leftover: TagSet,
}

impl PathPrefix {
    /// Assembles the prefix. Supplied tags are consumed positionally, in the
    /// order they appear in the record: each declared category matches the
    /// next unconsumed tag by name or falls back to [`UNKNOWN_COMPONENT`]
    /// without advancing. Tags left unconsumed become the record's tag
    /// metadata.
    pub fn new(device_type: &str, entity: Option<&str>, tags: &[(String, String)]) -> Self {
        let mut parts: Vec<String> = Vec::with_capacity(TAG_CATEGORIES.len() + 2);
        parts.push(sanitize_component(device_type));
        parts.push(match entity {
            Some(id) => format_entity(id),
            None => UNKNOWN_COMPONENT.to_string(),
        });

        let mut cursor = 0;
        for category in TAG_CATEGORIES {
            if cursor < tags.len() && tags[cursor].0 == category {
                parts.push(sanitize_component(&tags[cursor].1));
                cursor += 1;
            } else {
                parts.push(UNKNOWN_COMPONENT.to_string());
            }
        }

        let leftover = tags[cursor..]
            .iter()
            .map(|(k, v)| (k.clone(), sanitize_component(v)))
            .collect();

        PathPrefix {
            joined: parts.join("."),
            leftover,
        }
    }

    /// Produces the canonical path for one field of the record. The joined
    /// result gets a final hyphen rewrite, which is idempotent over the
    /// per-component sanitization.
    pub fn path_for(&self, field: &str) -> String {
        format!("{}.{}", self.joined, sanitize_component(field)).replace('-', "_")
    }

    /// Consumes the prefix, yielding the tags that did not become path
    /// components.
    pub fn into_leftover(self) -> TagSet {
        self.leftover
    }
}
