//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::PathBuf;

use patchdex_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .root_dir(tree.root())
///     .auto_cooldown_ms(0)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index.root_dir = path.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index.output_path = path.into();
        self
    }

    pub fn baseline_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index.baseline_path = Some(path.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.index.max_depth = depth;
        self
    }

    pub fn auto_cooldown_ms(mut self, ms: u64) -> Self {
        self.config.scheduler.auto_cooldown_ms = ms;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
