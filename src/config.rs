//! Settings and source definitions
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `FORECLOSED_*` environment variables. Each bank is a [`SourceSpec`]: plain
//! data describing its pages, locator and fields.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SchemaError};
use crate::fetch::Pages;
use crate::locator::LocatorSpec;
use crate::pipeline::Pipeline;
use crate::schema::{FieldSpec, Schema};
use crate::sources;

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "foreclosed.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Result cap applied to every bank unless it overrides it. Unset means
    /// no cap; `foreclosed list` shows the cap each bank ends up with.
    #[serde(default)]
    pub max_results_per_bank: Option<usize>,
    /// Extra or replacement sources; same id replaces the built-in one
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_user_agent() -> String {
    concat!("foreclosed_parser/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_results_per_bank: None,
            sources: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (required) or `foreclosed.toml` (optional),
    /// then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("FORECLOSED").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Built-in sources merged with the configured ones, in listing order.
    pub fn source_specs(&self) -> Vec<SourceSpec> {
        let mut specs = sources::builtin();
        for configured in &self.sources {
            match specs.iter_mut().find(|s| s.id == configured.id) {
                Some(existing) => *existing = configured.clone(),
                None => specs.push(configured.clone()),
            }
        }
        specs
    }

    pub fn source(&self, id: &str) -> Result<SourceSpec, ConfigError> {
        self.source_specs()
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ConfigError::UnknownSource(id.to_string()))
    }
}

/// Cap on the number of records a source keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultLimit {
    /// Use `max_results_per_bank`
    #[default]
    Global,
    Unlimited,
    Max(usize),
}

impl ResultLimit {
    pub fn resolve(self, global: Option<usize>) -> Option<usize> {
        match self {
            ResultLimit::Global => global,
            ResultLimit::Unlimited => None,
            ResultLimit::Max(max) => Some(max),
        }
    }
}

/// Everything needed to scrape one bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub name: String,
    /// Pages to fetch. Table sources decoded offline have none.
    #[serde(default)]
    pub pages: Option<Pages>,
    pub locator: LocatorSpec,
    pub fields: Vec<FieldSpec>,
    /// Dedup key fields in priority order
    #[serde(default)]
    pub identity: Vec<String>,
    /// Keep a record only if one of these fields has a real value
    #[serde(default)]
    pub require_any: Vec<String>,
    #[serde(default)]
    pub limit: ResultLimit,
    #[serde(default)]
    pub stop_on_empty_page: bool,
}

impl SourceSpec {
    /// Compile the source into a pipeline. All selectors, patterns and field
    /// references are checked here.
    /// Record cap for this source under the global setting.
    pub fn max_results(&self, max_results_per_bank: Option<usize>) -> Option<usize> {
        self.limit.resolve(max_results_per_bank)
    }

    pub fn build(&self, max_results_per_bank: Option<usize>) -> Result<Pipeline, ConfigError> {
        let wrap = |source| ConfigError::Source {
            id: self.id.clone(),
            source,
        };

        let schema = Schema::from_specs(&self.id, &self.fields).map_err(wrap)?;
        check_declared(&schema, "identity", &self.identity).map_err(wrap)?;
        check_declared(&schema, "require_any", &self.require_any).map_err(wrap)?;
        let locator = self.locator.build().map_err(wrap)?;

        Ok(Pipeline::new(&self.id, locator, schema)
            .identity(self.identity.clone())
            .require_any(self.require_any.clone())
            .max_results(self.max_results(max_results_per_bank))
            .stop_on_empty_page(self.stop_on_empty_page))
    }
}

fn check_declared(schema: &Schema, setting: &str, fields: &[String]) -> Result<(), SchemaError> {
    let names = schema.field_names();
    match fields.iter().find(|f| !names.contains(&f.as_str())) {
        Some(missing) => Err(SchemaError::UnknownSourceField {
            field: setting.to_string(),
            source_field: missing.clone(),
        }),
        None => Ok(()),
    }
}
