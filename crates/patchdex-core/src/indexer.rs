//! One rebuild pass: discover, load, expand, scan, build, write.
//!
//! All per-pass state (catalog, warning de-duplication) lives on the stack
//! of [`ItemIndexer::rebuild_blocking`], so consecutive passes never share
//! anything except the output file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use patchdex_config::{AppConfig, IndexConfig};

use crate::BoxFuture;
use crate::baseline::BaselineIds;
use crate::catalog::ItemCatalog;
use crate::content::ContentDocument;
use crate::i18n::{LocalizationTable, load_localization};
use crate::include::expand_includes;
use crate::index::{IndexDocument, WriteOutcome, write_if_changed};
use crate::jsonc::DocumentError;
use crate::package::{Package, discover_packages};
use crate::patch::Patch;
use crate::references::scan_reference_patch;
use crate::scanner::{ScanContext, scan_item_patch};
use crate::tokens::TokenTable;
use crate::warnings::{ScanWarning, WarningLog};

/// Errors that abort a rebuild pass.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("package root not found or not a directory: {0}")]
    ConfigNotFound(PathBuf),

    #[error("failed to load baseline identifiers: {0}")]
    Baseline(#[from] DocumentError),

    #[error("failed to write index to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rebuild task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Summary of a completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Packages discovered under the root.
    pub packages: usize,
    /// Entries in the produced index.
    pub entries: usize,
    /// Whether the output file was rewritten.
    pub written: bool,
    pub warnings: Vec<ScanWarning>,
    pub elapsed: Duration,
}

/// Something that can perform a rebuild pass for the scheduler.
pub trait RebuildRunner: Send + Sync {
    fn rebuild(&self) -> BoxFuture<'_, Result<RebuildReport, IndexError>>;
}

/// A package with its patches fully include-expanded.
struct LoadedPackage<'p> {
    package: &'p Package,
    dynamic_tokens: TokenTable,
    localization: LocalizationTable,
    patches: Vec<Patch>,
}

impl LoadedPackage<'_> {
    fn context(&self) -> ScanContext<'_> {
        ScanContext {
            package: self.package,
            dynamic_tokens: &self.dynamic_tokens,
            localization: &self.localization,
        }
    }

    /// Data edits this engine scans; edits addressing a nested field are skipped.
    fn data_edits(&self) -> impl Iterator<Item = &crate::patch::EditDataPatch> {
        self.patches.iter().filter_map(|patch| match patch {
            Patch::EditData(edit) if edit.target_field.is_none() => Some(edit),
            _ => None,
        })
    }
}

/// Builds the installed-item index from a package root.
#[derive(Debug, Clone)]
pub struct ItemIndexer {
    settings: IndexConfig,
    baseline: Arc<BaselineIds>,
}

impl ItemIndexer {
    pub fn new(settings: IndexConfig, baseline: BaselineIds) -> Self {
        Self {
            settings,
            baseline: Arc::new(baseline),
        }
    }

    /// Create an indexer from application config, loading the baseline file.
    pub fn from_config(config: &AppConfig) -> Result<Self, IndexError> {
        let baseline = match &config.index.baseline_path {
            Some(path) => BaselineIds::load(path)?,
            None => BaselineIds::new(),
        };
        Ok(Self::new(config.index.clone(), baseline))
    }

    pub fn settings(&self) -> &IndexConfig {
        &self.settings
    }

    /// Run a complete pass synchronously.
    pub fn rebuild_blocking(&self) -> Result<RebuildReport, IndexError> {
        let started = Instant::now();
        let root = &self.settings.root_dir;
        if !root.is_dir() {
            return Err(IndexError::ConfigNotFound(root.clone()));
        }
        debug!(
            root = %root.display(),
            version = %crate::build_info::version_string(),
            "Rebuild pass starting"
        );

        let mut warnings = WarningLog::new();
        let packages = discover_packages(root, self.settings.max_depth, &mut warnings);
        let loaded: Vec<LoadedPackage<'_>> = packages
            .iter()
            .filter_map(|package| load_package(package, &mut warnings))
            .collect();

        // Definitions first so a mention elsewhere never claims an item
        // that some package defines.
        let mut catalog = ItemCatalog::new(&self.baseline);
        for pkg in &loaded {
            let ctx = pkg.context();
            let added: usize = pkg
                .data_edits()
                .map(|edit| scan_item_patch(edit, &ctx, &mut catalog))
                .sum();
            debug!(package = %pkg.package.unique_id, added, "Scanned item definitions");
        }
        for pkg in &loaded {
            let ctx = pkg.context();
            let added: usize = pkg
                .data_edits()
                .map(|edit| scan_reference_patch(edit, &ctx, &packages, &mut catalog))
                .sum();
            debug!(package = %pkg.package.unique_id, added, "Scanned item references");
        }

        let document = IndexDocument::build(catalog.into_items());
        let output = &self.settings.output_path;
        let outcome = write_if_changed(output, &document).map_err(|source| IndexError::Write {
            path: output.clone(),
            source,
        })?;

        let report = RebuildReport {
            packages: packages.len(),
            entries: document.len(),
            written: outcome == WriteOutcome::Written,
            warnings: warnings.into_warnings(),
            elapsed: started.elapsed(),
        };
        info!(
            packages = report.packages,
            entries = report.entries,
            written = report.written,
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Item index rebuilt"
        );
        Ok(report)
    }
}

fn load_package<'p>(package: &'p Package, warnings: &mut WarningLog) -> Option<LoadedPackage<'p>> {
    let content = ContentDocument::load(package, warnings)?;
    let localization = load_localization(&package.root_dir, warnings);
    let patches = expand_includes(content.changes, package, &content.dynamic_tokens, warnings);
    Some(LoadedPackage {
        package,
        dynamic_tokens: content.dynamic_tokens,
        localization,
        patches,
    })
}

impl RebuildRunner for ItemIndexer {
    fn rebuild(&self) -> BoxFuture<'_, Result<RebuildReport, IndexError>> {
        let indexer = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || indexer.rebuild_blocking()).await?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn indexer(tmp: &TempDir, baseline: BaselineIds) -> ItemIndexer {
        let settings = IndexConfig {
            root_dir: tmp.path().join("Mods"),
            output_path: tmp.path().join("out/items.json"),
            baseline_path: None,
            max_depth: 4,
        };
        ItemIndexer::new(settings, baseline)
    }

    #[test]
    fn test_missing_root_is_config_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = indexer(&tmp, BaselineIds::new()).rebuild_blocking();
        assert!(matches!(result, Err(IndexError::ConfigNotFound(_))));
    }

    #[test]
    fn test_definition_wins_over_earlier_mention() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Mods/A/manifest.json", r#"{"UniqueID": "A.Shop"}"#);
        write(
            tmp.path(),
            "Mods/A/content.json",
            r#"{"Changes": [{"Action": "EditData", "Target": "Data/Shops",
                "Entries": {"shop": {"Items": [{"ItemId": "(O)B.Gems_Ruby"}]}}}]}"#,
        );
        write(tmp.path(), "Mods/B/manifest.json", r#"{"UniqueID": "B.Gems", "Name": "Gems"}"#);
        write(
            tmp.path(),
            "Mods/B/content.json",
            r#"{"Changes": [{"Action": "EditData", "Target": "Data/Objects",
                "Entries": {
                    "{{ModId}}_Ruby": {"Name": "{{ModId}}_Ruby", "DisplayName": "Ruby"}
                }}]}"#,
        );

        let report = indexer(&tmp, BaselineIds::new()).rebuild_blocking().unwrap();
        assert_eq!(report.packages, 2);

        let text = std::fs::read_to_string(tmp.path().join("out/items.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let ruby = value["objects"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["qualifiedId"] == "(O)B.Gems_Ruby")
            .unwrap();
        assert_eq!(ruby["name"], "Ruby");
        assert_eq!(ruby["modName"], "Gems");
    }

    #[test]
    fn test_target_field_edits_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Mods/A/manifest.json", r#"{"UniqueID": "A"}"#);
        write(
            tmp.path(),
            "Mods/A/content.json",
            r#"{"Changes": [{"Action": "EditData", "Target": "Data/Objects",
                "TargetField": ["Existing", "ContextTags"], "Entries": {"NotAnItem": "tag"}}]}"#,
        );
        let report = indexer(&tmp, BaselineIds::new()).rebuild_blocking().unwrap();
        assert_eq!(report.entries, 0);
        assert!(report.written);
    }

    #[tokio::test]
    async fn test_runner_trait_runs_on_blocking_pool() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("Mods")).unwrap();
        let runner: Arc<dyn RebuildRunner> = Arc::new(indexer(&tmp, BaselineIds::new()));
        let report = runner.rebuild().await.unwrap();
        assert_eq!(report.packages, 0);
        assert!(report.written);
    }

    fn blocked_indexer(tmp: &TempDir) -> ItemIndexer {
        std::fs::create_dir_all(tmp.path().join("Mods")).unwrap();
        std::fs::write(tmp.path().join("blocker"), "not a directory").unwrap();
        let settings = IndexConfig {
            root_dir: tmp.path().join("Mods"),
            output_path: tmp.path().join("blocker/items.json"),
            baseline_path: None,
            max_depth: 4,
        };
        ItemIndexer::new(settings, BaselineIds::new())
    }

    #[test]
    fn test_unwritable_output_is_write_error() {
        let tmp = TempDir::new().unwrap();
        let result = blocked_indexer(&tmp).rebuild_blocking();
        match result {
            Err(IndexError::Write { path, .. }) => {
                assert_eq!(path, tmp.path().join("blocker/items.json"));
            }
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unwritable_output_fails_scheduled_pass() {
        use crate::scheduler::{RebuildKind, RebuildOutcome, RebuildScheduler};
        use patchdex_config::SchedulerConfig;

        let tmp = TempDir::new().unwrap();
        let scheduler = RebuildScheduler::new(
            Arc::new(blocked_indexer(&tmp)),
            &SchedulerConfig::default(),
        );
        let outcome = scheduler.request(RebuildKind::Manual).await;
        match outcome {
            RebuildOutcome::Failed(message) => assert!(message.contains("failed to write index")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!scheduler.is_running());
        tokio::time::timeout(Duration::from_secs(2), scheduler.wait_idle())
            .await
            .unwrap();
    }
}
