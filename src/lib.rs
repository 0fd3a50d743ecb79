//! Foreclosed property listings from Philippine bank sites
//!
//! Turns bank listing pages and decoded PDF tables into clean JSON records:
//! - locate record blocks (HTML boundaries or table header rows)
//! - extract declared fields with defaults and cleanup transforms
//! - dedupe by identity fields and persist one file per bank

pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fragment;
pub mod locator;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod sources;
pub mod store;
pub mod transform;

pub use config::{ResultLimit, Settings, SourceSpec};
pub use dedup::Deduplicator;
pub use error::{ConfigError, ExtractError, FetchError, FieldError, SchemaError, StoreError};
pub use extract::extract;
pub use fragment::{Document, Fragment, Table, TableRow};
pub use locator::{BoundaryLocator, HeaderLocator, LocatorSpec, RecordLocator};
pub use pipeline::{Diagnostic, Pipeline, RunReport, RunState};
pub use record::{Record, RecordSet};
pub use schema::{FieldRule, FieldSpec, LocateSpec, Schema, NOT_AVAILABLE};
