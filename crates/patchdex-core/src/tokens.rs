//! Token expansion engine.
//!
//! Substitutes `{{Name}}` placeholders in strings and, structurally, in JSON
//! values. Two token families are reserved and never touched by
//! [`expand_str`]/[`expand_value`]:
//!
//! - `{{i18n:<key>}}`, resolved later by [`resolve_i18n`] against a
//!   package's [`LocalizationTable`];
//! - `{{ModId}}`, resolved later by [`substitute_mod_id`].
//!
//! Expansion is run to a fixed point bounded by [`MAX_EXPANSION_PASSES`], so
//! a token whose value contains another token is resolved, and re-expanding
//! an already expanded string is a no-op.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::i18n::LocalizationTable;

/// Upper bound on rewrite passes for one string.
pub const MAX_EXPANSION_PASSES: usize = 4;

/// The package identity placeholder.
pub const MOD_ID_TOKEN: &str = "{{ModId}}";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("token pattern is valid")
});

static I18N_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{\s*i18n\s*:\s*([^{}|\s]+)[^{}]*\}\}").expect("i18n pattern is valid")
});

/// Case-insensitive token name → value table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    values: HashMap<String, String>,
}

impl TokenTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a JSON object such as an include's `LocalTokens`.
    ///
    /// Scalar values are stringified; arrays, objects and nulls are ignored.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut table = Self::new();
        for (name, value) in map {
            if let Some(text) = scalar_to_string(value) {
                table.insert(name, text);
            }
        }
        table
    }

    /// Insert or overwrite a token.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.trim().to_lowercase(), value.into());
    }

    /// Look up a token by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return a copy of this table with `overrides` layered on top.
    pub fn with_overrides(&self, overrides: &TokenTable) -> TokenTable {
        let mut merged = self.clone();
        merged
            .values
            .extend(overrides.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

/// Stringify a JSON scalar the way token values are written in documents.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_reserved(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower == "modid"
        || lower
            .strip_prefix("i18n")
            .is_some_and(|rest| rest.trim_start().starts_with(':'))
}

/// Expand every non-reserved token in `input` found in `tokens`.
///
/// Unknown tokens are left verbatim.
pub fn expand_str(input: &str, tokens: &TokenTable) -> String {
    if tokens.is_empty() || !input.contains("{{") {
        return input.to_string();
    }

    let mut current = input.to_string();
    for _ in 0..MAX_EXPANSION_PASSES {
        let next = TOKEN_PATTERN
            .replace_all(&current, |caps: &Captures| {
                let name = &caps[1];
                if is_reserved(name) {
                    return caps[0].to_string();
                }
                tokens
                    .get(name)
                    .map_or_else(|| caps[0].to_string(), str::to_string)
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Expand tokens in every string and object key of a JSON value.
pub fn expand_value(value: &Value, tokens: &TokenTable) -> Value {
    if tokens.is_empty() {
        return value.clone();
    }
    match value {
        Value::String(s) => Value::String(expand_str(s, tokens)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| expand_value(v, tokens)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (expand_str(k, tokens), expand_value(v, tokens)))
                .collect(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

/// Replace the identity placeholder with the package's unique id.
pub fn substitute_mod_id(input: &str, unique_id: &str) -> String {
    input.replace(MOD_ID_TOKEN, unique_id)
}

/// Resolve `{{i18n:key}}` placeholders against a localization table.
///
/// A key missing from the table is replaced by the bare key text.
pub fn resolve_i18n(input: &str, table: &LocalizationTable) -> String {
    let mut current = input.to_string();
    for _ in 0..MAX_EXPANSION_PASSES {
        if !I18N_PATTERN.is_match(&current) {
            break;
        }
        current = I18N_PATTERN
            .replace_all(&current, |caps: &Captures| {
                let key = &caps[1];
                table.get(key).unwrap_or(key).to_string()
            })
            .into_owned();
    }
    current
}

/// Whether `input` still contains any `{{...}}` placeholder.
pub fn has_unresolved_tokens(input: &str) -> bool {
    TOKEN_PATTERN.is_match(input)
}
