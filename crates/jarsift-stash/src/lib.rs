//! Prior-archive stash for incremental diffs.
//!
//! The diff engine needs the previous build's archive as its old side, but
//! build pipelines overwrite the compiled archive in place. [`ArchiveStash`]
//! keeps a copy of each archive, keyed by file name, and hands back the
//! closest prior copy at diff time.
//!
//! # Key Types
//!
//! - [`ArchiveStash`] -- the stash directory handle
//! - [`StashEntry`] -- one retained archive (name, mtime, size)
//! - [`PruneReport`] -- what a retention pass removed

pub mod error;
pub mod stash;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StashError, StashResult};
pub use stash::{ArchiveStash, PruneReport, StashEntry};
