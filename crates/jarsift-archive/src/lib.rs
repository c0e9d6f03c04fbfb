//! Class archive access for jarsift.
//!
//! Exposes compiled archives as a browsable tree of units behind the
//! [`Archive`] trait, with three backends: a zip/jar container reader, an
//! exploded-directory walker, and an in-memory map for tests and embedding.
//! A deterministic [`ZipWriter`] rounds out the container support.
//!
//! # Key Types
//!
//! - [`Archive`] -- Read access to a compiled class archive
//! - [`ZipArchive`] / [`ZipWriter`] -- Zip/jar container reader and writer
//! - [`DirArchive`] -- Exploded class directory backend
//! - [`InMemoryArchive`] -- BTreeMap-backed backend for tests and embedding
//! - [`UnitMeta`] -- Cheap per-unit metadata (size, CRC-32)
//! - [`ArchiveError`] -- Container-level failure taxonomy

pub mod dir;
pub mod error;
pub mod format;
pub mod memory;
pub mod reader;
pub mod source;
pub mod writer;

// Re-export primary types at crate root for ergonomic imports.
pub use dir::DirArchive;
pub use error::{ArchiveError, ArchiveResult};
pub use format::CompressionMethod;
pub use memory::InMemoryArchive;
pub use reader::ZipArchive;
pub use source::{Archive, UnitMeta};
pub use writer::ZipWriter;
