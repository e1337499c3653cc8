//! Index builder and idempotent writer.
//!
//! The catalog is grouped into fixed category buckets, each sorted by
//! qualified identifier, and serialized through [`canonicalize`] so that the
//! same set of items always produces byte-identical text. The file on disk
//! is only rewritten when that text differs from what is already there.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::DiscoveredItem;
use crate::schema::Category;

/// One record in the index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: String,
    pub name: String,
    pub qualified_id: String,
    pub mod_id: String,
    pub mod_name: String,
}

/// The aggregated, sorted index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    buckets: BTreeMap<Category, Vec<IndexEntry>>,
}

impl IndexDocument {
    /// Group and sort catalog items.
    pub fn build(items: HashMap<String, DiscoveredItem>) -> Self {
        let mut buckets: BTreeMap<Category, Vec<IndexEntry>> = BTreeMap::new();
        for (qualified_id, item) in items {
            buckets.entry(item.category).or_default().push(IndexEntry {
                id: item.inner_id,
                name: item.display_name,
                qualified_id,
                mod_id: item.package_id,
                mod_name: item.package_name,
            });
        }
        for entries in buckets.values_mut() {
            entries.sort_by(|a, b| a.qualified_id.cmp(&b.qualified_id));
        }
        Self { buckets }
    }

    pub fn entries(&self, category: Category) -> &[IndexEntry] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of entries across all categories.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The JSON form: `categoryTypes` plus one array per category.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        let category_types: Map<String, Value> = Category::ALL
            .iter()
            .map(|c| (c.key().to_string(), Value::String(c.prefix().to_string())))
            .collect();
        root.insert("categoryTypes".to_string(), Value::Object(category_types));

        for category in Category::ALL {
            let entries = self
                .entries(category)
                .iter()
                .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
                .collect();
            root.insert(category.key().to_string(), Value::Array(entries));
        }
        Value::Object(root)
    }

    /// Canonical serialized text.
    pub fn to_canonical_text(&self) -> String {
        canonical_text(&self.to_value())
    }
}

/// Recursively sort every object's keys.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonicalize(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
    }
}

/// Pretty-printed canonical form with a trailing newline.
pub fn canonical_text(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(&canonicalize(value)).unwrap_or_default();
    text.push('\n');
    text
}

/// Result of [`write_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Write `document` to `path` unless an equivalent document is already there.
///
/// An existing file that parses as JSON is compared in canonical form; one
/// that does not is compared as raw text.
pub fn write_if_changed(path: &Path, document: &IndexDocument) -> std::io::Result<WriteOutcome> {
    let text = document.to_canonical_text();

    if let Ok(existing) = std::fs::read_to_string(path) {
        let existing = match serde_json::from_str::<Value>(&existing) {
            Ok(value) => canonical_text(&value),
            Err(_) => existing,
        };
        if existing == text {
            debug!(path = %path.display(), "Index unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    debug!(path = %path.display(), "Index written");
    Ok(WriteOutcome::Written)
}
