//! Per-pass warning log.
//!
//! Recoverable conditions found while scanning are recorded here. Each
//! distinct condition is logged and kept once per rebuild pass; a new
//! [`WarningLog`] is created for every pass.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

/// A recoverable condition encountered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScanWarning {
    /// A manifest, content or localization document could not be read.
    #[error("skipped unreadable document {path}: {message}")]
    DocumentParse { path: PathBuf, message: String },

    /// An include resolved to a file that does not exist.
    #[error("include target not found: {path}")]
    MissingInclude { path: PathBuf },

    /// An include target exists but could not be parsed.
    #[error("include target could not be parsed {path}: {message}")]
    IncludeParse { path: PathBuf, message: String },

    /// An include path still holds unresolved tokens after expansion.
    #[error("include deferred until its tokens resolve: {from_file}")]
    DeferredInclude { from_file: String },

    /// An include refers to a file already being expanded above it.
    #[error("include cycle detected at {path}")]
    CyclicInclude { path: PathBuf },
}

impl ScanWarning {
    fn dedup_key(&self) -> (u8, String) {
        match self {
            ScanWarning::DocumentParse { path, .. } => (0, path.display().to_string()),
            ScanWarning::MissingInclude { path } => (1, path.display().to_string()),
            ScanWarning::IncludeParse { path, .. } => (2, path.display().to_string()),
            ScanWarning::DeferredInclude { from_file } => (3, from_file.clone()),
            ScanWarning::CyclicInclude { path } => (4, path.display().to_string()),
        }
    }
}

/// De-duplicating collector for [`ScanWarning`]s.
#[derive(Debug, Default)]
pub struct WarningLog {
    seen: HashSet<(u8, String)>,
    warnings: Vec<ScanWarning>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning, logging it the first time it is seen.
    ///
    /// Returns `false` if an equivalent warning was already recorded.
    pub fn record(&mut self, warning: ScanWarning) -> bool {
        if !self.seen.insert(warning.dedup_key()) {
            return false;
        }
        match &warning {
            ScanWarning::DeferredInclude { .. } => debug!(%warning, "Include deferred"),
            _ => warn!(%warning, "Scan problem, continuing"),
        }
        self.warnings.push(warning);
        true
    }

    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ScanWarning> {
        self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
