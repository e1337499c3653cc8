//! Localization loader.
//!
//! Reads a package's `i18n/` directory. Only the `default`, `en` and `en-*`
//! locales are loaded, either as flat files (`i18n/en.json`) or as locale
//! folders (`i18n/en/*.json`). Sources load in the order `default`, `en`,
//! then `en-*` by name, and a later key overwrites an earlier one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::jsonc;
use crate::warnings::{ScanWarning, WarningLog};

/// Package-scoped localization key → string table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizationTable {
    strings: HashMap<String, String>,
}

impl LocalizationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Load order of a locale name, or `None` if the locale is not loaded.
fn locale_rank(name: &str) -> Option<u8> {
    let name = name.to_ascii_lowercase();
    match name.as_str() {
        "default" => Some(0),
        "en" => Some(1),
        _ if name.starts_with("en-") => Some(2),
        _ => None,
    }
}

fn is_json_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Load the localization table for the package rooted at `package_dir`.
pub fn load_localization(package_dir: &Path, warnings: &mut WarningLog) -> LocalizationTable {
    let mut table = LocalizationTable::new();
    let dir = package_dir.join("i18n");
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return table;
    };

    let mut sources: Vec<(u8, String, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let locale = if path.is_dir() {
            path.file_name()
        } else if is_json_file(&path) {
            path.file_stem()
        } else {
            None
        };
        let Some(locale) = locale.and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(rank) = locale_rank(locale) {
            sources.push((rank, locale.to_ascii_lowercase(), path));
        }
    }
    sources.sort();

    for (_, locale, path) in sources {
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(&path)
                .map(|rd| rd.flatten().map(|e| e.path()).filter(|p| is_json_file(p)).collect())
                .unwrap_or_default();
            files.sort();
            for file in files {
                load_file(&file, &mut table, warnings);
            }
        } else {
            load_file(&path, &mut table, warnings);
        }
        debug!(locale = %locale, keys = table.len(), "Loaded localization source");
    }
    table
}

fn load_file(path: &Path, table: &mut LocalizationTable, warnings: &mut WarningLog) {
    match jsonc::read_document(path) {
        Ok(Value::Object(map)) => {
            for (key, value) in map {
                if let Value::String(text) = value {
                    table.insert(key, text);
                }
            }
        }
        Ok(_) => {
            warnings.record(ScanWarning::DocumentParse {
                path: path.to_path_buf(),
                message: "expected a JSON object of strings".to_string(),
            });
        }
        Err(err) => {
            warnings.record(ScanWarning::DocumentParse {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    }
}
