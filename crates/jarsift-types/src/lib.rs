//! Foundation types for jarsift.
//!
//! This crate provides the path and grouping types used throughout the
//! incremental diff engine. Every other jarsift crate depends on
//! `jarsift-types`.
//!
//! # Key Types
//!
//! - [`ArchivePath`] -- Validated, normalized relative path inside a class archive
//! - [`GroupKey`] -- Identity of a logical class group (directory + outer name)
//! - [`PathError`] -- Validation failures for archive paths

pub mod error;
pub mod group;
pub mod path;

// Re-export primary types at crate root for ergonomic imports.
pub use error::PathError;
pub use group::GroupKey;
pub use path::ArchivePath;
