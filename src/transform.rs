//! Value cleanup transforms
//!
//! Transforms are written as short strings in source definitions
//! (`trim`, `strip_prefix:Location:`, `replace:PhP=>`) and parsed once when
//! the schema is built.

use url::Url;

use crate::error::SchemaError;

/// A pure string-to-string cleanup step.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Trim,
    CollapseWhitespace,
    /// Drop a leading label, then trim what is left.
    StripPrefix(String),
    /// Remove every occurrence of any of these characters.
    StripChars(String),
    Replace { from: String, to: String },
    Lowercase,
    Uppercase,
    /// Keep digits and the first decimal point.
    ParsePrice,
    /// Resolve a relative link against a base URL.
    AbsoluteUrl(Url),
    /// Placeholder values that mean "nothing here".
    ClearIf(Vec<String>),
}

impl Transform {
    /// Parse one transform string for `field`.
    pub fn parse(field: &str, spec: &str) -> Result<Self, SchemaError> {
        let (name, arg) = match spec.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg)),
            None => (spec.trim(), None),
        };

        let unknown = || SchemaError::UnknownTransform {
            field: field.to_string(),
            transform: spec.to_string(),
        };

        let transform = match (name, arg) {
            ("trim", None) => Transform::Trim,
            ("collapse_ws", None) => Transform::CollapseWhitespace,
            ("lowercase", None) => Transform::Lowercase,
            ("uppercase", None) => Transform::Uppercase,
            ("parse_price", None) => Transform::ParsePrice,
            ("strip_prefix", Some(label)) if !label.is_empty() => {
                Transform::StripPrefix(label.to_string())
            }
            ("strip_chars", Some(chars)) if !chars.is_empty() => {
                Transform::StripChars(chars.to_string())
            }
            ("replace", Some(arg)) => {
                let (from, to) = arg.split_once("=>").ok_or_else(unknown)?;
                if from.is_empty() {
                    return Err(unknown());
                }
                Transform::Replace {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            ("absolute_url", Some(base)) => {
                let base = base.trim();
                let url = Url::parse(base).map_err(|source| SchemaError::BaseUrl {
                    field: field.to_string(),
                    base: base.to_string(),
                    source,
                })?;
                Transform::AbsoluteUrl(url)
            }
            ("clear_if", Some(values)) => {
                Transform::ClearIf(values.split('|').map(|v| v.trim().to_string()).collect())
            }
            _ => return Err(unknown()),
        };

        Ok(transform)
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Transform::Trim => value.trim().to_string(),
            Transform::CollapseWhitespace => collapse_ws(value),
            Transform::StripPrefix(label) => value
                .trim_start()
                .strip_prefix(label.as_str())
                .unwrap_or(value)
                .trim()
                .to_string(),
            Transform::StripChars(chars) => {
                value.chars().filter(|c| !chars.contains(*c)).collect()
            }
            Transform::Replace { from, to } => value.replace(from.as_str(), to),
            Transform::Lowercase => value.to_lowercase(),
            Transform::Uppercase => value.to_uppercase(),
            Transform::ParsePrice => parse_price(value),
            Transform::AbsoluteUrl(base) => match base.join(value.trim()) {
                Ok(url) => url.to_string(),
                Err(_) => value.to_string(),
            },
            Transform::ClearIf(values) => {
                if values.iter().any(|v| v == value.trim()) {
                    String::new()
                } else {
                    value.to_string()
                }
            }
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_price(value: &str) -> String {
    let mut result = String::new();
    let mut has_decimal = false;
    for c in value.chars() {
        if c.is_ascii_digit() {
            result.push(c);
        } else if c == '.' && !has_decimal && !result.is_empty() {
            result.push('.');
            has_decimal = true;
        }
    }
    if result.ends_with('.') {
        result.pop();
    }
    result
}
