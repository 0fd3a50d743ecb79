//! Field rules and schemas
//!
//! A [`Schema`] is the ordered list of [`FieldRule`]s for one record type.
//! Sources describe their fields with serde-friendly [`FieldSpec`]s; building
//! the schema compiles selectors, patterns and transforms up front so a bad
//! definition fails before any document is read.

use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::transform::{collapse_ws, Transform};

/// Sentinel written for any field that could not be found.
pub const NOT_AVAILABLE: &str = "NA";

/// How a value is read off a matched element.
///
/// Grammar: `text`, `html`, `inner_html`, `attr:NAME`, `parent.<acc>`,
/// `children.N.<acc>`, `next.<acc>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    Text,
    Html,
    InnerHtml,
    Attr(String),
    Parent(Box<Accessor>),
    Child(usize, Box<Accessor>),
    Next(Box<Accessor>),
}

impl Accessor {
    pub fn parse(accessor: &str) -> Option<Self> {
        let accessor = accessor.trim();

        if let Some(rest) = accessor.strip_prefix("parent.") {
            return Some(Accessor::Parent(Box::new(Self::parse(rest)?)));
        }

        if let Some(rest) = accessor.strip_prefix("next.") {
            return Some(Accessor::Next(Box::new(Self::parse(rest)?)));
        }

        // children.N.text, children.N.attr:href
        if let Some(rest) = accessor.strip_prefix("children.") {
            let (index, child) = rest.split_once('.')?;
            let index: usize = index.parse().ok()?;
            return Some(Accessor::Child(index, Box::new(Self::parse(child)?)));
        }

        match accessor {
            "" | "text" => Some(Accessor::Text),
            "html" => Some(Accessor::Html),
            "inner_html" => Some(Accessor::InnerHtml),
            attr => attr
                .strip_prefix("attr:")
                .filter(|name| !name.is_empty())
                .map(|name| Accessor::Attr(name.to_string())),
        }
    }

    pub fn read(&self, element: ElementRef<'_>) -> Option<String> {
        match self {
            Accessor::Text => Some(element_text(element)),
            Accessor::Html => Some(element.html()),
            Accessor::InnerHtml => Some(element.inner_html()),
            Accessor::Attr(name) => element.value().attr(name).map(|v| v.trim().to_string()),
            Accessor::Parent(inner) => inner.read(ElementRef::wrap(element.parent()?)?),
            Accessor::Child(index, inner) => {
                // Only element children count, text nodes are skipped
                let child = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .nth(*index)?;
                inner.read(child)
            }
            Accessor::Next(inner) => {
                let sibling = element.next_siblings().find_map(ElementRef::wrap)?;
                inner.read(sibling)
            }
        }
    }
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_ws(&element.text().collect::<String>())
}

/// Where a field's raw value comes from.
#[derive(Debug, Clone)]
pub enum Locate {
    /// First matching descendant of the fragment.
    Css { selector: Selector, accessor: Accessor },
    /// Nth matching descendant (0-based).
    Nth {
        selector: Selector,
        index: usize,
        accessor: Accessor,
    },
    /// First matching descendant whose text starts with `label`; yields the rest.
    Label { selector: Selector, label: String },
    /// First matching descendant with text that starts with none of `labels`.
    Unlabeled { selector: Selector, labels: Vec<String> },
    /// Icon-labelled rows: the `occurrence`-th `row` whose `marker` carries
    /// `attr` containing `contains`, read through its `value` descendant.
    Tagged {
        row: Selector,
        marker: Selector,
        attr: String,
        contains: String,
        value: Selector,
        occurrence: usize,
    },
    /// Cell under the named header column.
    Column(String),
    ColumnIndex(usize),
    /// Carry-over metadata attached to a table row.
    Carry(String),
    /// Prefix of an earlier field up to the first delimiter.
    Before { field: String, delimiter: String },
    /// Text between the first `open` and the following `close` in an earlier field.
    Enclosed {
        field: String,
        open: String,
        close: String,
    },
    /// Capture group of a pattern applied to an earlier field.
    Capture {
        field: String,
        pattern: Regex,
        group: usize,
    },
    Constant(String),
    /// First alternative that yields a value.
    FirstOf(Vec<Locate>),
}

impl Locate {
    pub fn kind(&self) -> &'static str {
        match self {
            Locate::Css { .. } => "css",
            Locate::Nth { .. } => "nth",
            Locate::Label { .. } => "label",
            Locate::Unlabeled { .. } => "unlabeled",
            Locate::Tagged { .. } => "tagged",
            Locate::Column(_) => "column",
            Locate::ColumnIndex(_) => "column_index",
            Locate::Carry(_) => "carry",
            Locate::Before { .. } => "before",
            Locate::Enclosed { .. } => "enclosed",
            Locate::Capture { .. } => "capture",
            Locate::Constant(_) => "constant",
            Locate::FirstOf(_) => "first_of",
        }
    }

    /// Earlier fields this rule derives from.
    pub fn source_fields(&self) -> Vec<&str> {
        match self {
            Locate::Before { field, .. }
            | Locate::Enclosed { field, .. }
            | Locate::Capture { field, .. } => vec![field.as_str()],
            Locate::FirstOf(alternatives) => {
                alternatives.iter().flat_map(Locate::source_fields).collect()
            }
            _ => vec![],
        }
    }

    /// Whether resolving this rule touches the fragment itself.
    pub fn reads_fragment(&self) -> bool {
        match self {
            Locate::Before { .. }
            | Locate::Enclosed { .. }
            | Locate::Capture { .. }
            | Locate::Constant(_) => false,
            Locate::FirstOf(alternatives) => alternatives.iter().any(Locate::reads_fragment),
            _ => true,
        }
    }
}

/// One named output field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub locate: Locate,
    pub transforms: Vec<Transform>,
    pub default: String,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, locate: Locate) -> Self {
        Self {
            name: name.into(),
            locate,
            transforms: Vec::new(),
            default: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }
}

/// Ordered, validated set of field rules for one record type.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    rules: Vec<FieldRule>,
}

impl Schema {
    pub fn new(name: impl Into<String>, rules: Vec<FieldRule>) -> Result<Self, SchemaError> {
        let mut declared: HashSet<&str> = HashSet::new();

        for rule in &rules {
            for source in rule.locate.source_fields() {
                if !declared.contains(source) {
                    return Err(SchemaError::UnknownSourceField {
                        field: rule.name.clone(),
                        source_field: source.to_string(),
                    });
                }
            }
            if !declared.insert(rule.name.as_str()) {
                return Err(SchemaError::DuplicateField(rule.name.clone()));
            }
        }

        Ok(Self {
            name: name.into(),
            rules,
        })
    }

    /// Compile serde field specs into a schema.
    pub fn from_specs(name: impl Into<String>, specs: &[FieldSpec]) -> Result<Self, SchemaError> {
        let rules = specs
            .iter()
            .map(FieldSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(name, rules)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn default_of(&self, field: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.name == field)
            .map(|r| r.default.as_str())
    }
}

/// Serializable description of one field, as written in source definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub locate: LocateSpec,
    /// Cleanup steps: trim, collapse_ws, strip_prefix:X, parse_price, ...
    #[serde(default)]
    pub transform: Vec<String>,
    /// Value used when nothing is found; "NA" when omitted
    #[serde(default)]
    pub default: Option<String>,
}

/// Serializable form of [`Locate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocateSpec {
    Css {
        selector: String,
        #[serde(default)]
        accessor: Option<String>,
    },
    Nth {
        selector: String,
        index: usize,
        #[serde(default)]
        accessor: Option<String>,
    },
    Label {
        selector: String,
        label: String,
    },
    Unlabeled {
        selector: String,
        #[serde(default)]
        labels: Vec<String>,
    },
    Tagged {
        row: String,
        marker: String,
        attr: String,
        contains: String,
        value: String,
        #[serde(default)]
        occurrence: usize,
    },
    Column {
        name: String,
    },
    ColumnIndex {
        index: usize,
    },
    Carry {
        key: String,
    },
    Before {
        field: String,
        delimiter: String,
    },
    Enclosed {
        field: String,
        #[serde(default = "default_open")]
        open: String,
        #[serde(default = "default_close")]
        close: String,
    },
    Capture {
        field: String,
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
    Constant {
        value: String,
    },
    FirstOf {
        alternatives: Vec<LocateSpec>,
    },
}

fn default_open() -> String {
    "(".to_string()
}

fn default_close() -> String {
    ")".to_string()
}

fn default_group() -> usize {
    1
}

impl FieldSpec {
    pub fn new(name: &str, locate: LocateSpec) -> Self {
        Self {
            name: name.to_string(),
            locate,
            transform: Vec::new(),
            default: None,
        }
    }

    pub fn transform(mut self, transform: &str) -> Self {
        self.transform.push(transform.to_string());
        self
    }

    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn compile(&self) -> Result<FieldRule, SchemaError> {
        let locate = self.locate.compile(&self.name)?;
        let transforms = self
            .transform
            .iter()
            .map(|t| Transform::parse(&self.name, t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FieldRule {
            name: self.name.clone(),
            locate,
            transforms,
            default: self
                .default
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        })
    }
}

impl LocateSpec {
    pub fn css(selector: &str) -> Self {
        LocateSpec::Css {
            selector: selector.to_string(),
            accessor: None,
        }
    }

    pub fn css_with(selector: &str, accessor: &str) -> Self {
        LocateSpec::Css {
            selector: selector.to_string(),
            accessor: Some(accessor.to_string()),
        }
    }

    pub fn nth(selector: &str, index: usize) -> Self {
        LocateSpec::Nth {
            selector: selector.to_string(),
            index,
            accessor: None,
        }
    }

    pub fn label(selector: &str, label: &str) -> Self {
        LocateSpec::Label {
            selector: selector.to_string(),
            label: label.to_string(),
        }
    }

    pub fn column(name: &str) -> Self {
        LocateSpec::Column {
            name: name.to_string(),
        }
    }

    pub fn carry(key: &str) -> Self {
        LocateSpec::Carry {
            key: key.to_string(),
        }
    }

    pub fn before(field: &str, delimiter: &str) -> Self {
        LocateSpec::Before {
            field: field.to_string(),
            delimiter: delimiter.to_string(),
        }
    }

    pub fn enclosed(field: &str) -> Self {
        LocateSpec::Enclosed {
            field: field.to_string(),
            open: default_open(),
            close: default_close(),
        }
    }

    pub fn capture(field: &str, pattern: &str) -> Self {
        LocateSpec::Capture {
            field: field.to_string(),
            pattern: pattern.to_string(),
            group: default_group(),
        }
    }

    pub fn constant(value: &str) -> Self {
        LocateSpec::Constant {
            value: value.to_string(),
        }
    }

    fn compile(&self, field: &str) -> Result<Locate, SchemaError> {
        let locate = match self {
            LocateSpec::Css { selector, accessor } => Locate::Css {
                selector: parse_selector(field, selector)?,
                accessor: parse_accessor(field, accessor.as_deref())?,
            },
            LocateSpec::Nth {
                selector,
                index,
                accessor,
            } => Locate::Nth {
                selector: parse_selector(field, selector)?,
                index: *index,
                accessor: parse_accessor(field, accessor.as_deref())?,
            },
            LocateSpec::Label { selector, label } => Locate::Label {
                selector: parse_selector(field, selector)?,
                label: label.clone(),
            },
            LocateSpec::Unlabeled { selector, labels } => Locate::Unlabeled {
                selector: parse_selector(field, selector)?,
                labels: labels.clone(),
            },
            LocateSpec::Tagged {
                row,
                marker,
                attr,
                contains,
                value,
                occurrence,
            } => Locate::Tagged {
                row: parse_selector(field, row)?,
                marker: parse_selector(field, marker)?,
                attr: attr.clone(),
                contains: contains.clone(),
                value: parse_selector(field, value)?,
                occurrence: *occurrence,
            },
            LocateSpec::Column { name } => Locate::Column(name.clone()),
            LocateSpec::ColumnIndex { index } => Locate::ColumnIndex(*index),
            LocateSpec::Carry { key } => Locate::Carry(key.clone()),
            LocateSpec::Before { field: source, delimiter } => Locate::Before {
                field: source.clone(),
                delimiter: delimiter.clone(),
            },
            LocateSpec::Enclosed {
                field: source,
                open,
                close,
            } => Locate::Enclosed {
                field: source.clone(),
                open: open.clone(),
                close: close.clone(),
            },
            LocateSpec::Capture {
                field: source,
                pattern,
                group,
            } => Locate::Capture {
                field: source.clone(),
                pattern: Regex::new(pattern).map_err(|source| SchemaError::Pattern {
                    field: field.to_string(),
                    source,
                })?,
                group: *group,
            },
            LocateSpec::Constant { value } => Locate::Constant(value.clone()),
            LocateSpec::FirstOf { alternatives } => Locate::FirstOf(
                alternatives
                    .iter()
                    .map(|alt| alt.compile(field))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(locate)
    }
}

pub(crate) fn parse_selector(field: &str, css: &str) -> Result<Selector, SchemaError> {
    Selector::parse(css).map_err(|e| SchemaError::Selector {
        field: field.to_string(),
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

fn parse_accessor(field: &str, accessor: Option<&str>) -> Result<Accessor, SchemaError> {
    let accessor = accessor.unwrap_or("text");
    Accessor::parse(accessor).ok_or_else(|| SchemaError::UnknownAccessor {
        field: field.to_string(),
        accessor: accessor.to_string(),
    })
}
