//! Primary configuration document (`content.json`) and its dynamic tokens.

use serde_json::Value;
use tracing::debug;

use crate::jsonc;
use crate::package::Package;
use crate::patch::{Patch, parse_changes};
use crate::tokens::{TokenTable, expand_str, scalar_to_string};
use crate::warnings::{ScanWarning, WarningLog};

/// File name of a package's primary configuration document.
pub const CONTENT_FILE: &str = "content.json";

/// A package's parsed primary configuration document.
#[derive(Debug, Clone, Default)]
pub struct ContentDocument {
    pub dynamic_tokens: TokenTable,
    pub changes: Vec<Patch>,
}

impl ContentDocument {
    /// Load `content.json` from the package root.
    ///
    /// Returns `None` if the package has no content document or it cannot be
    /// parsed (the latter is recorded as a warning).
    pub fn load(package: &Package, warnings: &mut WarningLog) -> Option<Self> {
        let path = package.root_dir.join(CONTENT_FILE);
        if !path.is_file() {
            debug!(package = %package.unique_id, "No content document");
            return None;
        }
        match jsonc::read_document(&path) {
            Ok(document) => Some(Self::from_value(&document)),
            Err(err) => {
                warnings.record(ScanWarning::DocumentParse {
                    path,
                    message: err.to_string(),
                });
                None
            }
        }
    }

    pub fn from_value(document: &Value) -> Self {
        Self {
            dynamic_tokens: load_dynamic_tokens(document),
            changes: parse_changes(document),
        }
    }
}

/// Build the dynamic token table from a document's `DynamicTokens` list.
///
/// Entries apply in order: each value is expanded against the tokens
/// declared before it, and a repeated name overwrites the earlier value.
pub fn load_dynamic_tokens(document: &Value) -> TokenTable {
    let mut table = TokenTable::new();
    let Some(entries) = document.get("DynamicTokens").and_then(Value::as_array) else {
        return table;
    };

    for entry in entries {
        let Some(name) = entry.get("Name").and_then(Value::as_str).map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let Some(value) = entry.get("Value").and_then(scalar_to_string) else {
            continue;
        };
        let value = expand_str(&value, &table);
        table.insert(name, value);
    }
    table
}
