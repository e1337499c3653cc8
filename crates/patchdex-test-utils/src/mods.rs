//! Temporary mod-folder fixtures.
//!
//! [`ModTreeBuilder`] lays out a `Mods/` directory of content packages inside
//! a [`TempDir`]; the directory is removed when the resulting [`ModTree`] is
//! dropped, even on panic.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::trace;

use crate::config::TestConfigBuilder;

/// Builder for a temporary package root.
///
/// ```ignore
/// let tree = ModTreeBuilder::new()
///     .package("MyMod", "Author.Mod", "My Mod")
///     .content("MyMod", &json!({"Changes": []}))
///     .i18n("MyMod", "default", &json!({"item.name": "Magic Bean"}))
///     .build();
/// ```
pub struct ModTreeBuilder {
    tree: ModTree,
}

impl ModTreeBuilder {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = temp.path().join("Mods");
        std::fs::create_dir_all(&root).expect("failed to create Mods dir");
        Self {
            tree: ModTree { temp, root },
        }
    }

    /// Add a package folder with a manifest.
    pub fn package(self, folder: &str, unique_id: &str, name: &str) -> Self {
        let manifest = json!({
            "Name": name,
            "UniqueID": unique_id,
            "Version": "1.0.0",
            "ContentPackFor": {"UniqueID": "Pathoschild.ContentPatcher"}
        });
        self.json(&format!("{folder}/manifest.json"), &manifest)
    }

    /// Write a package's `content.json`.
    pub fn content(self, folder: &str, content: &Value) -> Self {
        self.json(&format!("{folder}/content.json"), content)
    }

    /// Write a package's `content.json` verbatim, e.g. with comments.
    pub fn content_text(self, folder: &str, text: &str) -> Self {
        self.file(&format!("{folder}/content.json"), text)
    }

    /// Write `i18n/<locale>.json` inside a package.
    pub fn i18n(self, folder: &str, locale: &str, entries: &Value) -> Self {
        self.json(&format!("{folder}/i18n/{locale}.json"), entries)
    }

    /// Write a pretty-printed JSON file relative to the `Mods` root.
    pub fn json(self, rel_path: &str, value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).expect("fixture JSON serializes");
        self.file(rel_path, &text)
    }

    /// Write an arbitrary file relative to the `Mods` root.
    pub fn file(self, rel_path: &str, content: &str) -> Self {
        self.tree.write(rel_path, content);
        self
    }

    pub fn build(self) -> ModTree {
        self.tree
    }
}

impl Default for ModTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built package root plus a scratch area for outputs.
pub struct ModTree {
    temp: TempDir,
    root: PathBuf,
}

impl ModTree {
    /// The `Mods` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The temp directory containing `Mods` and any outputs.
    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    /// Default index location, outside the package root.
    pub fn output_path(&self) -> PathBuf {
        self.temp.path().join("out").join("installed-items.json")
    }

    /// Config builder pointed at this tree.
    pub fn config(&self) -> TestConfigBuilder {
        TestConfigBuilder::new()
            .root_dir(self.root())
            .output_path(self.output_path())
    }

    /// Create or overwrite a file relative to the `Mods` root.
    pub fn write(&self, rel_path: &str, content: &str) {
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
        trace!(path = %path.display(), "Wrote fixture");
    }

    /// Parse the index written to [`ModTree::output_path`].
    pub fn read_output(&self) -> Value {
        let text = std::fs::read_to_string(self.output_path()).expect("index was written");
        serde_json::from_str(&text).expect("index is valid JSON")
    }
}
