//! Baseline identifier set.
//!
//! Qualified identifiers that already exist outside the scanned packages
//! (vanilla and otherwise known items). The index never emits them.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::jsonc::{self, DocumentError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineIds {
    ids: HashSet<String>,
}

impl BaselineIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a baseline file.
    ///
    /// The document is either a JSON array of qualified identifiers or an
    /// object whose values are such arrays (e.g. `{"vanilla": [...],
    /// "custom": [...]}`). A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        if !path.exists() {
            debug!(path = %path.display(), "No baseline file, starting from an empty set");
            return Ok(Self::new());
        }

        let shape_error = || DocumentError::Shape {
            path: path.to_path_buf(),
            expected: "an array of qualified identifiers",
        };

        let mut baseline = Self::new();
        match jsonc::read_document(path)? {
            Value::Array(items) => baseline.extend_from_array(&items),
            Value::Object(groups) => {
                for group in groups.values() {
                    let items = group.as_array().ok_or_else(shape_error)?;
                    baseline.extend_from_array(items);
                }
            }
            _ => return Err(shape_error()),
        }
        debug!(path = %path.display(), count = baseline.len(), "Loaded baseline identifiers");
        Ok(baseline)
    }

    fn extend_from_array(&mut self, items: &[Value]) {
        self.ids
            .extend(items.iter().filter_map(Value::as_str).map(str::to_string));
    }

    pub fn insert(&mut self, qualified_id: impl Into<String>) {
        self.ids.insert(qualified_id.into());
    }

    pub fn contains(&self, qualified_id: &str) -> bool {
        self.ids.contains(qualified_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for BaselineIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let baseline = BaselineIds::load(Path::new("/nonexistent/baseline.json")).unwrap();
        assert!(baseline.is_empty());
    }

    #[test]
    fn test_load_array_and_grouped_forms() {
        let tmp = TempDir::new().unwrap();
        let flat = tmp.path().join("flat.json");
        std::fs::write(&flat, r#"["(O)388", "(BC)12", 7]"#).unwrap();
        let grouped = tmp.path().join("grouped.json");
        std::fs::write(
            &grouped,
            "{\n // vanilla ids\n \"vanilla\": [\"(O)388\"],\n \"custom\": [\"(H)Fancy\"],\n}",
        )
        .unwrap();

        let flat = BaselineIds::load(&flat).unwrap();
        assert_eq!(flat.len(), 2);
        assert!(flat.contains("(BC)12"));

        let grouped = BaselineIds::load(&grouped).unwrap();
        assert!(grouped.contains("(O)388"));
        assert!(grouped.contains("(H)Fancy"));
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, r#""(O)388""#).unwrap();
        assert!(matches!(
            BaselineIds::load(&path),
            Err(DocumentError::Shape { .. })
        ));
    }

    #[test]
    fn test_from_iterator() {
        let baseline: BaselineIds = ["(O)1", "(O)2"].into_iter().collect();
        assert!(baseline.contains("(O)1"));
        assert!(!baseline.contains("(O)3"));
    }
}
