//! Record extraction
//!
//! Applies a [`Schema`] to one [`Fragment`]. Every declared field ends up in
//! the record: a rule that finds nothing, or fails, falls back to its default.

use std::collections::HashMap;

use scraper::ElementRef;
use tracing::debug;

use crate::error::{ExtractError, FieldError};
use crate::fragment::Fragment;
use crate::record::Record;
use crate::schema::{element_text, FieldRule, Locate, Schema};

/// Values found so far in the current record. `None` means the field fell
/// back to its default.
type Resolved<'s> = HashMap<&'s str, Option<String>>;

pub fn extract(fragment: &Fragment<'_>, schema: &Schema) -> Result<Record, ExtractError> {
    let mut resolved: Resolved<'_> = HashMap::with_capacity(schema.rules().len());
    let mut fields = Vec::with_capacity(schema.rules().len());
    let mut readers = 0;
    let mut unsupported = 0;

    for rule in schema.rules() {
        let reads_fragment = rule.locate.reads_fragment();
        if reads_fragment {
            readers += 1;
        }

        let value = match resolve(&rule.locate, fragment, &resolved) {
            Ok(Some(raw)) => clean(rule, raw),
            Ok(None) => None,
            Err(err) => {
                if reads_fragment && matches!(err, FieldError::Unsupported { .. }) {
                    unsupported += 1;
                }
                debug!(field = %rule.name, error = %err, "field uses default");
                None
            }
        };

        fields.push((
            rule.name.clone(),
            value.clone().unwrap_or_else(|| rule.default.clone()),
        ));
        resolved.insert(rule.name.as_str(), value);
    }

    if readers > 0 && unsupported == readers {
        return Err(ExtractError::Incompatible {
            schema: schema.name().to_string(),
            fragment: fragment.kind(),
        });
    }

    Ok(Record::new(fields))
}

/// Run the transforms; empty means "no value".
fn clean(rule: &FieldRule, raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    let value = rule
        .transforms
        .iter()
        .fold(raw, |value, transform| transform.apply(&value));
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn resolve(
    locate: &Locate,
    fragment: &Fragment<'_>,
    resolved: &Resolved<'_>,
) -> Result<Option<String>, FieldError> {
    match (locate, fragment) {
        (Locate::Constant(value), _) => Ok(Some(value.clone())),

        (Locate::Before { field, delimiter }, _) => Ok(source(resolved, field)?.map(|value| {
            match value.split_once(delimiter.as_str()) {
                Some((head, _)) => head.trim().to_string(),
                None => value.trim().to_string(),
            }
        })),

        (Locate::Enclosed { field, open, close }, _) => {
            Ok(source(resolved, field)?.and_then(|value| {
                let (_, rest) = value.split_once(open.as_str())?;
                let (inner, _) = rest.split_once(close.as_str())?;
                Some(inner.trim().to_string())
            }))
        }

        (Locate::Capture { field, pattern, group }, _) => {
            Ok(source(resolved, field)?.and_then(|value| {
                let captures = pattern.captures(value)?;
                captures.get(*group).map(|m| m.as_str().to_string())
            }))
        }

        (Locate::FirstOf(alternatives), _) => {
            let mut first_error = None;
            let mut any_ok = false;
            for alternative in alternatives {
                match resolve(alternative, fragment, resolved) {
                    Ok(Some(value)) if !value.trim().is_empty() => return Ok(Some(value)),
                    Ok(_) => any_ok = true,
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            match first_error {
                Some(err) if !any_ok => Err(err),
                _ => Ok(None),
            }
        }

        (Locate::Css { selector, accessor }, Fragment::Html(element)) => Ok(element
            .select(selector)
            .next()
            .and_then(|found| accessor.read(found))),

        (
            Locate::Nth {
                selector,
                index,
                accessor,
            },
            Fragment::Html(element),
        ) => Ok(element
            .select(selector)
            .nth(*index)
            .and_then(|found| accessor.read(found))),

        (Locate::Label { selector, label }, Fragment::Html(element)) => Ok(element
            .select(selector)
            .map(element_text)
            .find_map(|text| text.strip_prefix(label.as_str()).map(|rest| rest.trim().to_string()))),

        (Locate::Unlabeled { selector, labels }, Fragment::Html(element)) => Ok(element
            .select(selector)
            .map(element_text)
            .find(|text| {
                !text.is_empty() && !labels.iter().any(|label| text.starts_with(label.as_str()))
            })),

        (
            Locate::Tagged {
                row,
                marker,
                attr,
                contains,
                value,
                occurrence,
            },
            Fragment::Html(element),
        ) => Ok(element
            .select(row)
            .filter(|r| {
                r.select(marker)
                    .any(|m| attr_contains(m, attr, contains))
            })
            .nth(*occurrence)
            .and_then(|r| r.select(value).next())
            .map(element_text)),

        (Locate::Column(name), Fragment::Row(row)) => Ok(row.column(name).map(String::from)),
        (Locate::ColumnIndex(index), Fragment::Row(row)) => Ok(row.cell(*index).map(String::from)),
        (Locate::Carry(key), Fragment::Row(row)) => Ok(row.carried(key).map(String::from)),

        (locate, fragment) => Err(FieldError::Unsupported {
            locate: locate.kind(),
            fragment: fragment.kind(),
        }),
    }
}

/// Value of an earlier field, `None` when it fell back to its default.
fn source<'r>(resolved: &'r Resolved<'_>, field: &str) -> Result<Option<&'r str>, FieldError> {
    resolved
        .get(field)
        .map(|value| value.as_deref())
        .ok_or_else(|| FieldError::Unresolved(field.to_string()))
}

/// Attribute match that also accepts namespaced names (`xlink:href` for `href`).
fn attr_contains(element: ElementRef<'_>, attr: &str, needle: &str) -> bool {
    let local = attr.rsplit(':').next().unwrap_or(attr);
    element
        .value()
        .attrs()
        .any(|(name, value)| (name == attr || name == local) && value.contains(needle))
}
