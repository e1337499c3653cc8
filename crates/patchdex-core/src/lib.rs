#![deny(unsafe_code)]

//! Patchdex core engine.
//!
//! Reads a tree of Content Patcher packages, resolves their tokens and
//! includes the way the game would, and writes a sorted index of every item
//! the installed packages add. A [`RebuildScheduler`] serializes passes so
//! hosts can trigger rebuilds freely from watchers or user commands.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send` boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Identifiers shipped with the base game, excluded from the index.
pub mod baseline;
/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Shared per-pass map of discovered items, first writer wins.
pub mod catalog;
/// `content.json` loading and dynamic tokens.
pub mod content;
/// Per-package translation tables.
pub mod i18n;
/// Recursive `Include` expansion.
pub mod include;
/// Index document building and idempotent writing.
pub mod index;
/// One rebuild pass and the runner trait the scheduler drives.
pub mod indexer;
/// Lenient JSON-with-comments reader.
pub mod jsonc;
/// Package discovery and manifest identity.
pub mod package;
/// Typed `Changes` operations.
pub mod patch;
/// Reference scanner for items mentioned by recipes, shops and the like.
pub mod references;
/// Item-defining patch scanner.
pub mod scanner;
/// Single-flight rebuild scheduling with coalescing and throttling.
pub mod scheduler;
/// Target-asset schema table and item categories.
pub mod schema;
/// `{{Token}}` expansion.
pub mod tokens;
/// Recoverable scan problems, de-duplicated per pass.
pub mod warnings;

pub use baseline::BaselineIds;
pub use index::{IndexDocument, IndexEntry};
pub use indexer::{IndexError, ItemIndexer, RebuildReport, RebuildRunner};
pub use scheduler::{RebuildKind, RebuildOutcome, RebuildScheduler};
pub use schema::Category;
pub use warnings::ScanWarning;
