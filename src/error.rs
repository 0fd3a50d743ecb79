//! Error types
//!
//! Only configuration mistakes and whole-document failures surface to callers.
//! Field-level and fragment-level errors are recovered inside the pipeline and
//! show up as diagnostics instead.

use std::path::PathBuf;

use thiserror::Error;

/// A schema or locator definition that cannot be built.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("field `{field}`: invalid selector `{selector}`: {reason}")]
    Selector {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("field `{field}`: invalid pattern: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("field `{field}` derives from `{source_field}`, which is not declared before it")]
    UnknownSourceField { field: String, source_field: String },

    #[error("field `{field}`: unknown accessor `{accessor}`")]
    UnknownAccessor { field: String, accessor: String },

    #[error("field `{field}`: unknown transform `{transform}`")]
    UnknownTransform { field: String, transform: String },

    #[error("field `{field}`: invalid base url `{base}`: {source}")]
    BaseUrl {
        field: String,
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("locator: {0}")]
    Locator(String),
}

/// One rule could not be resolved against one fragment.
///
/// Never escapes the extractor: the field falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("`{locate}` cannot read a {fragment} fragment")]
    Unsupported {
        locate: &'static str,
        fragment: &'static str,
    },

    #[error("source field `{0}` has not been resolved")]
    Unresolved(String),
}

/// A whole fragment could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("schema `{schema}` has no rule that can read a {fragment} fragment")]
    Incompatible {
        schema: String,
        fragment: &'static str,
    },
}

/// The fetch collaborator could not supply a document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode table file {}: {source}", path.display())]
    Tables {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("source `{0}` has no pages to fetch")]
    NoPages(String),
}

/// Settings could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("source `{id}`: {source}")]
    Source {
        id: String,
        #[source]
        source: SchemaError,
    },

    #[error("unknown bank `{0}`")]
    UnknownSource(String),
}

/// Records could not be persisted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}
