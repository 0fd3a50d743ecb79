//! Extracted records

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Field values in schema order, plus where the record came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
    provenance: String,
}

impl Record {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            fields,
            provenance: String::new(),
        }
    }

    pub fn with_provenance(mut self, source: impl Into<String>) -> Self {
        self.provenance = source.into();
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Source id (URL or file) the record was extracted from. Not serialized.
    pub fn provenance(&self) -> &str {
        &self.provenance
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Final records of one source, serialized as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordSet {
    pub name: String,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for RecordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}
