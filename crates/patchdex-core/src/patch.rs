//! Patch operations.
//!
//! The working unit of a scan. Only two action kinds matter to the indexer:
//! data edits, which may add items, and includes, which splice another
//! document's operations in place. Everything else is carried through
//! untouched as [`Patch::Other`].

use serde_json::{Map, Value};

use crate::tokens::TokenTable;

/// One operation from a document's `Changes` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    EditData(EditDataPatch),
    Include(IncludePatch),
    Other { action: String, raw: Value },
}

/// An add/edit-data operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDataPatch {
    /// Raw `Target` value, possibly a comma-separated list.
    pub target: String,
    /// `TargetField`, when the edit addresses a nested field.
    pub target_field: Option<Value>,
    pub entries: Map<String, Value>,
    pub when: Option<Value>,
}

impl EditDataPatch {
    /// The individual targets named by `Target`.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.target.split(',').map(str::trim).filter(|t| !t.is_empty())
    }
}

/// A file-inclusion operation.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludePatch {
    /// Unexpanded file references, one per path.
    pub from_file: Vec<String>,
    pub local_tokens: TokenTable,
    pub when: Option<Value>,
}

impl Patch {
    /// Classify a raw operation object.
    pub fn from_value(value: &Value) -> Self {
        let action = value
            .get("Action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();

        if action.eq_ignore_ascii_case("EditData") {
            Patch::EditData(EditDataPatch {
                target: string_field(value, "Target").unwrap_or_default(),
                target_field: value.get("TargetField").filter(|v| !v.is_null()).cloned(),
                entries: value
                    .get("Entries")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                when: guard(value),
            })
        } else if action.eq_ignore_ascii_case("Include") {
            Patch::Include(IncludePatch {
                from_file: file_references(value.get("FromFile")),
                local_tokens: value
                    .get("LocalTokens")
                    .and_then(Value::as_object)
                    .map(TokenTable::from_json_map)
                    .unwrap_or_default(),
                when: guard(value),
            })
        } else {
            Patch::Other {
                action: action.to_string(),
                raw: value.clone(),
            }
        }
    }

    /// The conditional guard attached to this operation, if any.
    pub fn when(&self) -> Option<&Value> {
        match self {
            Patch::EditData(p) => p.when.as_ref(),
            Patch::Include(p) => p.when.as_ref(),
            Patch::Other { raw, .. } => guard_ref(raw),
        }
    }

    /// Attach `when` unless the operation already carries its own guard.
    pub fn inherit_guard(&mut self, when: &Value) {
        match self {
            Patch::EditData(p) => {
                p.when.get_or_insert_with(|| when.clone());
            }
            Patch::Include(p) => {
                p.when.get_or_insert_with(|| when.clone());
            }
            Patch::Other { raw, .. } => {
                if guard_ref(raw).is_none()
                    && let Value::Object(map) = raw
                {
                    map.insert("When".to_string(), when.clone());
                }
            }
        }
    }
}

/// Parse a document's `Changes` array; a missing or non-array value is empty.
pub fn parse_changes(document: &Value) -> Vec<Patch> {
    document
        .get("Changes")
        .and_then(Value::as_array)
        .map(|changes| changes.iter().map(Patch::from_value).collect())
        .unwrap_or_default()
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn guard_ref(value: &Value) -> Option<&Value> {
    value
        .get("When")
        .filter(|w| !w.is_null() && w.as_object().is_none_or(|m| !m.is_empty()))
}

fn guard(value: &Value) -> Option<Value> {
    guard_ref(value).cloned()
}

/// Split `FromFile` into individual paths.
///
/// Accepts a single path, a comma-separated list, or an array of either.
fn file_references(value: Option<&Value>) -> Vec<String> {
    let split = |s: &str| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    match value {
        Some(Value::String(s)) => split(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split)
            .collect(),
        _ => Vec::new(),
    }
}
