//! Incremental diff engine for compiled class archives.
//!
//! This crate compares a freshly built archive against the previous build's
//! archive and decides, unit by unit, what actually changed. Changed units
//! are copied into a scratch directory so a downstream step can process just
//! those files instead of the whole archive.
//!
//! # Workflow
//!
//! 1. [`diff_archives`] opens both jars (the old one is optional) and hands
//!    them to [`diff_units`], which also accepts any other [`Archive`]
//!    backend such as an exploded class directory.
//! 2. [`classify_units`] buckets every `.class` unit of the new archive into
//!    changed or unchanged. Units that belong to the same outer class are
//!    classified as a group, so editing an outer class invalidates its inner
//!    classes and vice versa.
//! 3. [`materialize_changed`] writes the changed units into a fresh scratch
//!    directory and returns a [`DiffReport`].
//!
//! # Key Types
//!
//! - [`DiffOptions`] -- per-invocation knobs (scratch root, removed-unit
//!   handling)
//! - [`ClassificationMap`] -- the changed/unchanged verdict per unit
//! - [`DiffReport`] -- changed and unchanged paths plus the scratch
//!   directory, serializable as a JSON manifest
//!
//! # Design Rules
//!
//! 1. A first build (no old archive) marks every unit changed.
//! 2. Classification never splits a logical class group.
//! 3. Metadata (size, CRC-32) only ever proves a change; equal metadata
//!    still falls through to a byte compare.
//! 4. Every invocation gets its own scratch directory; a failed one is
//!    removed again.
//!
//! [`Archive`]: jarsift_archive::Archive

pub mod classify;
pub mod diff;
pub mod error;
pub mod materialize;
pub mod report;

// Re-export primary types at crate root for ergonomic imports.
pub use classify::{classify_units, Classification, ClassificationMap};
pub use diff::{diff_archives, diff_units, DiffOptions};
pub use error::{EngineError, EngineResult};
pub use materialize::materialize_changed;
pub use report::DiffReport;
