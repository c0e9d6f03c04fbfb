use std::fs;
use std::path::{Path, PathBuf};

use jarsift_types::ArchivePath;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The outcome of one archive diff.
///
/// `changed` and `unchanged` partition the compiled units of the new
/// archive; both lists are sorted by path. `scratch_dir` holds a copy of
/// exactly the changed units at their archive-relative paths and belongs
/// to the caller once the report exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Units that must be re-decompiled, sorted by path.
    pub changed: Vec<ArchivePath>,
    /// Units whose previous output can be reused, sorted by path.
    pub unchanged: Vec<ArchivePath>,
    /// Directory holding the changed units, owned by the caller.
    pub scratch_dir: PathBuf,
}

impl DiffReport {
    /// Total number of classified units.
    pub fn total(&self) -> usize {
        self.changed.len() + self.unchanged.len()
    }

    /// Returns `true` if nothing changed.
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty()
    }

    /// Source files whose previously decompiled output can be copied
    /// forward, sorted and deduplicated.
    ///
    /// Inner classes are merged into their outer class's source file, so
    /// only outer units contribute, mapped `.class` to `.java`.
    pub fn source_copy_plan(&self) -> Vec<ArchivePath> {
        let mut plan: Vec<ArchivePath> = self
            .unchanged
            .iter()
            .filter(|path| !path.is_inner_class())
            .filter_map(|path| path.source_path())
            .collect();
        plan.sort();
        plan.dedup();
        plan
    }

    /// Persist the report as a JSON manifest.
    pub fn write_manifest(&self, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| EngineError::Manifest(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a report previously written with
    /// [`DiffReport::write_manifest`].
    pub fn load_manifest(path: &Path) -> EngineResult<Self> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| EngineError::Manifest(e.to_string()))
    }
}
