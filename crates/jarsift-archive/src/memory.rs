use std::collections::BTreeMap;

use jarsift_types::ArchivePath;

use crate::error::ArchiveResult;
use crate::source::{Archive, UnitMeta};

/// In-memory, BTreeMap-backed archive.
///
/// Intended for tests and embedding. Entries are held sorted by path, so
/// listings are deterministic without an extra sort.
#[derive(Clone, Default)]
pub struct InMemoryArchive {
    entries: BTreeMap<ArchivePath, Vec<u8>>,
}

impl InMemoryArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entry, replacing any previous content at the same path.
    pub fn insert(&mut self, path: ArchivePath, data: impl Into<Vec<u8>>) {
        self.entries.insert(path, data.into());
    }

    /// Remove one entry. Returns `true` if it existed.
    pub fn remove(&mut self, path: &ArchivePath) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Archive for InMemoryArchive {
    fn unit_paths(&self) -> ArchiveResult<Vec<ArchivePath>> {
        Ok(self
            .entries
            .keys()
            .filter(|path| path.is_class_file())
            .cloned()
            .collect())
    }

    fn read_unit(&self, path: &ArchivePath) -> ArchiveResult<Option<Vec<u8>>> {
        Ok(self.entries.get(path).cloned())
    }

    fn unit_meta(&self, path: &ArchivePath) -> ArchiveResult<Option<UnitMeta>> {
        Ok(self.entries.get(path).map(|data| UnitMeta {
            size: data.len() as u64,
            crc32: Some(crc32fast::hash(data)),
        }))
    }
}

impl std::fmt::Debug for InMemoryArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryArchive")
            .field("entry_count", &self.entries.len())
            .finish()
    }
}
