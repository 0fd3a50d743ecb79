//! Record locators
//!
//! A locator finds the ordered fragments of a document, one per record.
//! Two strategies are provided:
//! - [`BoundaryLocator`]: HTML blocks recognized by a title marker
//! - [`HeaderLocator`]: table rows under a detected header row

mod boundary_locator;
mod header_locator;

pub use boundary_locator::BoundaryLocator;
pub use header_locator::{CarryOverPolicy, HeaderLocator, HeaderPolicy};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::fragment::{Document, Fragment};

pub trait RecordLocator {
    /// Fragments in document order. An empty result means no records were
    /// found, which is not an error.
    fn locate<'a>(&self, document: &'a Document) -> Vec<Fragment<'a>>;
}

/// Serializable locator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LocatorSpec {
    Boundary {
        #[serde(default)]
        container: Option<String>,
        title: String,
        #[serde(default)]
        actions: Option<String>,
        #[serde(default = "default_max_depth")]
        max_depth: usize,
    },
    Header {
        keywords: Vec<String>,
        #[serde(default)]
        disclaimer_keywords: Vec<String>,
        #[serde(default = "default_threshold")]
        threshold_percent: usize,
        #[serde(default = "default_min_cells")]
        min_cells: usize,
        #[serde(default)]
        carry_over: Option<CarryOverPolicy>,
    },
}

pub(crate) fn default_max_depth() -> usize {
    8
}

pub(crate) fn default_threshold() -> usize {
    30
}

pub(crate) fn default_min_cells() -> usize {
    2
}

impl LocatorSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            LocatorSpec::Boundary { .. } => "html",
            LocatorSpec::Header { .. } => "pdf tables",
        }
    }

    pub fn build(&self) -> Result<Box<dyn RecordLocator>, SchemaError> {
        match self {
            LocatorSpec::Boundary {
                container,
                title,
                actions,
                max_depth,
            } => {
                let mut locator = BoundaryLocator::new(title)?.max_depth(*max_depth);
                if let Some(container) = container {
                    locator = locator.container(container)?;
                }
                if let Some(actions) = actions {
                    locator = locator.actions(actions)?;
                }
                Ok(Box::new(locator))
            }
            LocatorSpec::Header {
                keywords,
                disclaimer_keywords,
                threshold_percent,
                min_cells,
                carry_over,
            } => {
                let policy = HeaderPolicy::new(keywords.clone(), *threshold_percent)?
                    .disclaimers(disclaimer_keywords.clone())
                    .min_cells(*min_cells);
                let mut locator = HeaderLocator::new(policy);
                if let Some(carry_over) = carry_over {
                    locator = locator.carry_over(carry_over.clone())?;
                }
                Ok(Box::new(locator))
            }
        }
    }
}
