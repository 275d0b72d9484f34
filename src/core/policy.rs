//! Per-replica data-sharing policy.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::identity::{PropertyId, RelationTypeId, TemplateId, ThesaurusId};

/// What a single replica may receive. Immutable for the duration of a
/// sync cycle; a record is visible only through these whitelists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub relation_types: BTreeSet<RelationTypeId>,
    pub thesauri: BTreeSet<ThesaurusId>,
    /// Templates the replica may see, each with its own property rule.
    pub templates: BTreeMap<TemplateId, TemplateRule>,
}

impl Policy {
    pub fn template_rule(&self, id: &TemplateId) -> Option<&TemplateRule> {
        self.templates.get(id)
    }

    pub fn template_allowed(&self, id: &TemplateId) -> bool {
        self.templates.contains_key(id)
    }

    pub fn relation_type_allowed(&self, id: &RelationTypeId) -> bool {
        self.relation_types.contains(id)
    }

    pub fn thesaurus_allowed(&self, id: &ThesaurusId) -> bool {
        self.thesauri.contains(id)
    }
}

/// Which properties of a whitelisted template leave the master, plus an
/// optional structural predicate entities must satisfy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateRule {
    pub properties: BTreeSet<PropertyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl TemplateRule {
    pub fn allows_property(&self, id: &PropertyId) -> bool {
        self.properties.contains(id)
    }
}

/// A filter predicate could not be evaluated safely. Projection treats
/// this as a refusal to send, never as a match.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter references unknown field `{field}`")]
    UnknownField { field: String },
    #[error("filter must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// Structurally match `doc` against a JSON predicate.
///
/// The predicate is an object of dotted field paths to expected values.
/// Scalars compare by equality; an array in the document matches if any
/// element does; nested objects recurse over the expected keys. Metadata
/// values wrap scalars in a `value` field, so an object on the document
/// side also matches a scalar through that field. A top-level path that
/// does not resolve is an error, not a mismatch.
pub fn matches_filter(doc: &Value, filter: &Value) -> Result<bool, FilterError> {
    let Some(entries) = filter.as_object() else {
        return Err(FilterError::NotAnObject {
            found: json_kind(filter),
        });
    };
    for (path, expected) in entries {
        let found = resolve_path(doc, path).ok_or_else(|| FilterError::UnknownField {
            field: path.clone(),
        })?;
        if !value_matches(found, expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn value_matches(found: &Value, expected: &Value) -> bool {
    match (found, expected) {
        (Value::Array(items), expected) if !expected.is_array() => {
            items.iter().any(|item| value_matches(item, expected))
        }
        (Value::Object(_), Value::Object(map)) => map.iter().all(|(key, inner_expected)| {
            found
                .get(key)
                .is_some_and(|inner| value_matches(inner, inner_expected))
        }),
        (Value::Object(map), expected) => {
            map.get("value").is_some_and(|value| value == expected)
        }
        _ => found == expected,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
