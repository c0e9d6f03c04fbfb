use jarsift_types::ArchivePath;

use crate::error::ArchiveResult;

/// Cheap per-unit metadata, used to rule out equality without reading bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitMeta {
    /// Uncompressed size in bytes.
    pub size: u64,
    /// CRC-32 of the uncompressed bytes, when the backend records one.
    pub crc32: Option<u32>,
}

/// Read access to a compiled class archive.
///
/// All implementations must satisfy these invariants:
/// - `unit_paths` lists compiled units (`.class` entries) only, sorted by
///   path, each exactly once.
/// - `read_unit` returns `Ok(None)` for a unit that is not present; absence
///   is a normal outcome, not an error.
/// - `unit_meta` returns `Some` exactly when the entry is present. Metadata
///   inequality implies content inequality; metadata equality proves
///   nothing.
/// - Archives are immutable while a handle is open. All I/O errors are
///   propagated, never silently ignored.
pub trait Archive: Send + Sync {
    /// List all compiled units, sorted by path.
    fn unit_paths(&self) -> ArchiveResult<Vec<ArchivePath>>;

    /// Read the uncompressed bytes of one entry.
    ///
    /// Returns `Ok(None)` if the archive holds no entry at `path`.
    fn read_unit(&self, path: &ArchivePath) -> ArchiveResult<Option<Vec<u8>>>;

    /// Cheap metadata for one entry, without reading its bytes.
    ///
    /// Returns `Ok(None)` if the archive holds no entry at `path`.
    fn unit_meta(&self, path: &ArchivePath) -> ArchiveResult<Option<UnitMeta>>;

    /// Whether the archive holds an entry at `path`.
    fn contains(&self, path: &ArchivePath) -> ArchiveResult<bool> {
        Ok(self.unit_meta(path)?.is_some())
    }

    /// The compiled units sharing one parent directory.
    ///
    /// Default implementation filters `unit_paths()`. Backends may override
    /// to avoid the full listing.
    fn siblings(&self, dir: &str) -> ArchiveResult<Vec<ArchivePath>> {
        Ok(self
            .unit_paths()?
            .into_iter()
            .filter(|path| path.parent() == dir)
            .collect())
    }
}
