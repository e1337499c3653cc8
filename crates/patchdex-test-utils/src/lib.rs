#![deny(unsafe_code)]

//! Shared test utilities for the patchdex workspace.
//!
//! Provides a temporary mod-tree builder, config builders and tracing
//! helpers so that individual crate tests stay concise.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! patchdex-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod mods;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use mods::{ModTree, ModTreeBuilder};
