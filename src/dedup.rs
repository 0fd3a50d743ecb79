//! Duplicate removal
//!
//! A record's identity is the first of the configured fields that holds a
//! real value. Records without one are always kept.

use std::collections::HashSet;

use tracing::debug;

use crate::record::Record;
use crate::schema::NOT_AVAILABLE;

#[derive(Debug, Clone)]
pub struct Deduplicator {
    identity_fields: Vec<String>,
    sentinel: String,
}

impl Deduplicator {
    pub fn new(identity_fields: Vec<String>) -> Self {
        Self {
            identity_fields,
            sentinel: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn identity_fields(&self) -> &[String] {
        &self.identity_fields
    }

    /// `(field, value)` of the first usable identity field.
    pub fn key<'r>(&self, record: &'r Record) -> Option<(&'r str, &'r str)> {
        self.identity_fields.iter().find_map(|field| {
            let (name, value) = record.fields().iter().find(|(name, _)| name == field)?;
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed == self.sentinel {
                None
            } else {
                Some((name.as_str(), trimmed))
            }
        })
    }

    /// Keep first occurrences in order. Returns the kept records and how
    /// many were dropped.
    pub fn dedupe(&self, records: Vec<Record>) -> (Vec<Record>, usize) {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        let mut removed = 0;

        for record in records {
            let duplicate = match self.key(&record) {
                Some((field, value)) => !seen.insert((field.to_string(), value.to_string())),
                None => false,
            };
            if duplicate {
                debug!(source = %record.provenance(), "duplicate record dropped");
                removed += 1;
            } else {
                kept.push(record);
            }
        }

        (kept, removed)
    }
}
