//! Pipeline orchestration
//!
//! Drives locate, extract, filter and dedupe over every document of one
//! source. Failures below the document level never abort the run.

use std::fmt;

use tracing::{debug, info, warn};

use crate::dedup::Deduplicator;
use crate::error::{ExtractError, FetchError};
use crate::extract::extract;
use crate::fragment::Document;
use crate::locator::RecordLocator;
use crate::record::{Record, RecordSet};
use crate::schema::Schema;

/// Progress of a run. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Fetching,
    Locating,
    Extracting { done: usize, total: usize },
    Deduplicating,
    Done,
    Failed,
}

impl RunState {
    fn rank(&self) -> u8 {
        match self {
            RunState::Fetching => 0,
            RunState::Locating => 1,
            RunState::Extracting { .. } => 2,
            RunState::Deduplicating => 3,
            RunState::Done | RunState::Failed => 4,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Fetching => write!(f, "fetching"),
            RunState::Locating => write!(f, "locating"),
            RunState::Extracting { done, total } => write!(f, "extracting ({done}/{total})"),
            RunState::Deduplicating => write!(f, "deduplicating"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// A fragment that could not become a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source: String,
    /// Position of the fragment within its document
    pub fragment: usize,
    pub error: ExtractError,
}

#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub records: RecordSet,
    pub documents: usize,
    pub fragments: usize,
    pub duplicates: usize,
    /// Records dropped by the meaningful-data filter
    pub discarded: usize,
    /// Records cut by the result limit
    pub truncated: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub unavailable: Vec<FetchError>,
}

/// Extraction pipeline for one source.
pub struct Pipeline {
    name: String,
    locator: Box<dyn RecordLocator>,
    schema: Schema,
    dedup: Deduplicator,
    require_any: Vec<String>,
    max_results: Option<usize>,
    stop_on_empty_page: bool,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, locator: Box<dyn RecordLocator>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            locator,
            schema,
            dedup: Deduplicator::new(Vec::new()),
            require_any: Vec::new(),
            max_results: None,
            stop_on_empty_page: false,
        }
    }

    pub fn identity(mut self, fields: Vec<String>) -> Self {
        self.dedup = Deduplicator::new(fields);
        self
    }

    /// Drop records whose listed fields all hold their defaults.
    pub fn require_any(mut self, fields: Vec<String>) -> Self {
        self.require_any = fields;
        self
    }

    pub fn max_results(mut self, limit: Option<usize>) -> Self {
        self.max_results = limit;
        self
    }

    /// End the run at the first document with no records or that cannot be fetched.
    pub fn stop_on_empty_page(mut self, stop: bool) -> Self {
        self.stop_on_empty_page = stop;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn is_meaningful(&self, record: &Record) -> bool {
        if self.require_any.is_empty() {
            return true;
        }
        self.require_any
            .iter()
            .any(|field| record.get(field) != self.schema.default_of(field))
    }

    /// Run over documents in source order. Documents are pulled lazily.
    pub fn run<I>(&self, documents: I) -> RunReport
    where
        I: IntoIterator<Item = Result<Document, FetchError>>,
    {
        let mut state = RunState::Fetching;
        let mut records: Vec<Record> = Vec::new();
        let mut report = RunReport {
            state,
            records: RecordSet::default(),
            documents: 0,
            fragments: 0,
            duplicates: 0,
            discarded: 0,
            truncated: 0,
            diagnostics: Vec::new(),
            unavailable: Vec::new(),
        };

        info!(source = %self.name, "run started");

        for document in documents {
            let document = match document {
                Ok(document) => document,
                Err(err) => {
                    warn!(source = %self.name, error = %err, "document unavailable");
                    report.unavailable.push(err);
                    // Open-ended paging has no next page past a failed one
                    if self.stop_on_empty_page {
                        info!(source = %self.name, "page unavailable, stopping");
                        break;
                    }
                    continue;
                }
            };
            report.documents += 1;

            if state == RunState::Fetching {
                self.advance(&mut state, RunState::Locating);
            }

            let fragments = self.locator.locate(&document);
            if fragments.is_empty() && self.stop_on_empty_page {
                info!(source = %self.name, page = %document.source(), "empty page, stopping");
                break;
            }

            let done = report.fragments;
            let total = done + fragments.len();
            report.fragments = total;
            self.advance(&mut state, RunState::Extracting { done, total });

            let (mut extracted, mut dropped) = (0, 0);
            for (index, fragment) in fragments.iter().enumerate() {
                match extract(fragment, &self.schema) {
                    Ok(record) => {
                        extracted += 1;
                        let record = record.with_provenance(document.source());
                        if self.is_meaningful(&record) {
                            records.push(record);
                        } else {
                            dropped += 1;
                        }
                    }
                    Err(error) => {
                        warn!(
                            source = %self.name,
                            page = %document.source(),
                            fragment = index,
                            error = %error,
                            "fragment skipped"
                        );
                        report.diagnostics.push(Diagnostic {
                            source: document.source().to_string(),
                            fragment: index,
                            error,
                        });
                    }
                }
                state = RunState::Extracting {
                    done: done + index + 1,
                    total,
                };
            }

            report.discarded += dropped;
            if extracted > 0 && dropped == extracted {
                warn!(
                    source = %self.name,
                    page = %document.source(),
                    discarded = dropped,
                    "every record on the page was discarded, check the field names"
                );
            }
        }

        if report.documents == 0 {
            self.advance(&mut state, RunState::Failed);
            warn!(
                source = %self.name,
                unavailable = report.unavailable.len(),
                "no document could be obtained"
            );
            report.state = state;
            report.records = RecordSet::new(self.name.clone(), records);
            return report;
        }

        self.advance(&mut state, RunState::Deduplicating);
        let (mut kept, duplicates) = self.dedup.dedupe(records);
        report.duplicates = duplicates;

        if let Some(limit) = self.max_results {
            if kept.len() > limit {
                report.truncated = kept.len() - limit;
                kept.truncate(limit);
            }
        }

        self.advance(&mut state, RunState::Done);
        info!(
            source = %self.name,
            records = kept.len(),
            duplicates,
            discarded = report.discarded,
            failed = report.diagnostics.len(),
            "run finished"
        );

        report.state = state;
        report.records = RecordSet::new(self.name.clone(), kept);
        report
    }

    fn advance(&self, state: &mut RunState, next: RunState) {
        debug_assert!(next.rank() >= state.rank(), "{state} -> {next}");
        debug!(source = %self.name, from = %state, to = %next, "state");
        *state = next;
    }
}
