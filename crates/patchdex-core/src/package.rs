//! Package discovery and manifest reading.
//!
//! A folder under the configured root is a package iff it directly contains
//! a `manifest.json`. Hidden folders (leading `.`) are skipped, discovery
//! does not descend into a package once found, and depth is bounded.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::jsonc;
use crate::warnings::{ScanWarning, WarningLog};

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

const UNIQUE_ID_FIELDS: [&str; 4] = ["UniqueID", "UniqueId", "uniqueId", "uniqueID"];
const NAME_FIELDS: [&str; 2] = ["Name", "name"];

/// Identity of one discovered content package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub unique_id: String,
    pub name: String,
    pub root_dir: PathBuf,
}

impl Package {
    /// Read the manifest in `dir`.
    ///
    /// Missing or invalid identity fields fall back to the folder name; an
    /// unreadable manifest is recorded as a warning and uses the same
    /// fallback.
    pub fn read(dir: &Path, warnings: &mut WarningLog) -> Self {
        let folder = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = match jsonc::read_document(&manifest_path) {
            Ok(value) => value,
            Err(err) => {
                warnings.record(ScanWarning::DocumentParse {
                    path: manifest_path,
                    message: err.to_string(),
                });
                Value::Null
            }
        };

        let unique_id = first_string_field(&manifest, &UNIQUE_ID_FIELDS).unwrap_or(folder.as_str());
        let name = first_string_field(&manifest, &NAME_FIELDS).unwrap_or(folder.as_str());

        Self {
            unique_id: unique_id.to_string(),
            name: name.to_string(),
            root_dir: dir.to_path_buf(),
        }
    }
}

fn first_string_field<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|f| value.get(*f).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Discover every package below `root`, ordered by folder path.
pub fn discover_packages(root: &Path, max_depth: usize, warnings: &mut WarningLog) -> Vec<Package> {
    let mut packages = Vec::new();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            walker.skip_current_dir();
            continue;
        }
        if entry.path().join(MANIFEST_FILE).is_file() {
            let package = Package::read(entry.path(), warnings);
            debug!(
                package = %package.unique_id,
                path = %entry.path().display(),
                "Discovered package"
            );
            packages.push(package);
            walker.skip_current_dir();
        }
    }
    packages
}
