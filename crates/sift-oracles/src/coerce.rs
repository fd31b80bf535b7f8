//! Lenient coercion of raw oracle text into label candidates.
//!
//! Providers drift from the requested shape in small ways: code fences,
//! wrapper objects, camelCase keys, a bare string where a list was asked
//! for. This module absorbs those differences. It never decides whether a
//! label is valid; that is the validator's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sift_abstraction::{AnnotationBatch, LabelCandidate, OracleFault, RecordId};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const ID_KEYS: &[&str] = &["record_id", "recordId", "id"];
const PRIMARY_KEYS: &[&str] =
    &["primary_category", "primaryCategory", "primary", "primary_label", "primaryLabel"];
const SECONDARY_KEYS: &[&str] = &[
    "secondary_categories",
    "secondaryCategories",
    "secondary_category",
    "secondaryCategory",
    "secondary",
    "secondary_label",
    "secondaryLabel",
];
const CONFIDENCE_KEYS: &[&str] = &["confidence", "score"];
const RATIONALE_KEYS: &[&str] = &["rationale", "reason", "explanation"];
const WRAPPER_KEYS: &[&str] = &["labels", "items", "data", "results", "output", "predictions"];

/// Provider-side spelling corrections, applied before validation.
///
/// Keys are matched after trimming, upper-casing and turning spaces and
/// dashes into underscores, so `"ui-ux"` and `"UI UX"` hit the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAliases {
    /// Aliases for `primary_category`.
    #[serde(default)]
    pub primary: BTreeMap<String, String>,
    /// Aliases for entries of `secondary_categories`.
    #[serde(default)]
    pub secondary: BTreeMap<String, String>,
}

impl LabelAliases {
    fn lookup(table: &BTreeMap<String, String>, value: &str) -> String {
        let trimmed = value.trim();
        if table.is_empty() {
            return trimmed.to_string();
        }
        let key = alias_key(trimmed);
        table
            .iter()
            .find(|(alias, _)| alias_key(alias) == key)
            .map_or_else(|| trimmed.to_string(), |(_, target)| target.clone())
    }

    /// Resolves a primary value through the alias table.
    pub fn primary(&self, value: &str) -> String {
        Self::lookup(&self.primary, value)
    }

    /// Resolves a secondary value through the alias table.
    pub fn secondary(&self, value: &str) -> String {
        Self::lookup(&self.secondary, value)
    }
}

fn alias_key(value: &str) -> String {
    value.trim().to_uppercase().replace([' ', '-'], "_")
}

/// Strips markdown code fences and a trailing semicolon.
pub fn clean_response_text(text: &str) -> String {
    let mut stripped = text.trim().to_string();

    if stripped.starts_with("```") {
        let mut lines: Vec<&str> = stripped.lines().skip(1).collect();
        while lines.last().is_some_and(|l| l.trim().starts_with("```")) {
            lines.pop();
        }
        stripped = lines.join("\n").trim().to_string();
    }

    if let Some(rest) = stripped.strip_suffix(';') {
        stripped = rest.trim_end().to_string();
    }

    stripped
}

fn first_value<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| item.get(*k)).filter(|v| !v.is_null())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn secondary_list(value: Option<&Value>, aliases: &LabelAliases) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            items.iter().filter_map(scalar_string).map(|s| aliases.secondary(&s)).collect()
        }
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![aliases.secondary(s)],
        _ => Vec::new(),
    }
}

/// Finds the list of label items in a parsed response.
fn label_items(value: Value) -> Result<Vec<Value>, OracleFault> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(_)) = map.get(*key) {
                    if let Some(Value::Array(items)) = map.remove(*key) {
                        return Ok(items);
                    }
                }
            }
            let looks_like_item = ID_KEYS.iter().chain(PRIMARY_KEYS).any(|k| map.contains_key(*k));
            if looks_like_item {
                Ok(vec![Value::Object(map)])
            } else {
                Err(OracleFault::MalformedResponse(
                    "response object contains no label list".to_string(),
                ))
            }
        }
        other => Err(OracleFault::MalformedResponse(format!(
            "expected a JSON array of labels, got {}",
            other
        ))),
    }
}

/// Parses raw response text into candidates for `batch`.
///
/// Items without an id are correlated by position only when the response has
/// exactly one item per batch record; otherwise they keep an empty id and the
/// caller treats them as unmatched.
///
/// # Errors
/// Returns `OracleFault::MalformedResponse` when the text is not JSON or has
/// no recognizable label list.
pub fn parse_candidates(
    text: &str,
    batch: &AnnotationBatch,
    aliases: &LabelAliases,
) -> Result<Vec<LabelCandidate>, OracleFault> {
    let cleaned = clean_response_text(text);
    if cleaned.is_empty() {
        debug!(batch_id = %batch.batch_id, "Oracle returned an empty body");
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| OracleFault::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let items = label_items(value)?;
    let positional = items.len() == batch.len();

    let mut candidates = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            warn!(batch_id = %batch.batch_id, index, "Skipping non-object label item");
            continue;
        };

        let record_id = match first_value(&map, ID_KEYS).and_then(scalar_string) {
            Some(id) => RecordId(id.trim().to_string()),
            None if positional => batch.records[index].id.clone(),
            None => RecordId(String::new()),
        };

        let primary_category = first_value(&map, PRIMARY_KEYS)
            .and_then(scalar_string)
            .map(|p| aliases.primary(&p))
            .unwrap_or_default();

        let secondary_categories = secondary_list(first_value(&map, SECONDARY_KEYS), aliases);
        let confidence = first_value(&map, CONFIDENCE_KEYS).and_then(Value::as_f64);
        let rationale = first_value(&map, RATIONALE_KEYS).and_then(scalar_string);

        candidates.push(LabelCandidate {
            record_id,
            primary_category,
            secondary_categories,
            confidence,
            rationale,
        });
    }

    Ok(candidates)
}
