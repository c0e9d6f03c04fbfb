//! Diff entry points and per-invocation options.

use std::path::{Path, PathBuf};

use jarsift_archive::{Archive, ZipArchive};
use tracing::info;

use crate::classify::classify_units;
use crate::error::{EngineError, EngineResult};
use crate::materialize::materialize_changed;
use crate::report::DiffReport;

/// Options for one diff invocation.
#[derive(Clone, Debug, Default)]
pub struct DiffOptions {
    /// Parent directory for the scratch directory (default: the system
    /// temp directory). Created if missing.
    pub scratch_root: Option<PathBuf>,
    /// Also invalidate a group when old members of it vanished from the
    /// new archive (default: `false`, matching the plain walk over the
    /// new archive).
    pub invalidate_on_removed_units: bool,
}

/// Diff two compiled jar archives and materialize the changed units.
///
/// `old_jar` is `None` on a first build, which marks every unit of
/// `new_jar` changed. Both archive handles are owned by this call and
/// released before the report is returned.
pub fn diff_archives(
    new_jar: &Path,
    old_jar: Option<&Path>,
    options: &DiffOptions,
) -> EngineResult<DiffReport> {
    let new = open_zip(new_jar)?;
    let old = match old_jar {
        Some(path) => Some(open_zip(path)?),
        None => None,
    };
    diff_units(&new, old.as_ref().map(|archive| archive as &dyn Archive), options)
}

/// Diff two already-open archives of any backend.
pub fn diff_units(
    new: &dyn Archive,
    old: Option<&dyn Archive>,
    options: &DiffOptions,
) -> EngineResult<DiffReport> {
    let classifications = classify_units(new, old, options)?;
    let report = materialize_changed(new, &classifications, options)?;
    info!(
        changed = report.changed.len(),
        unchanged = report.unchanged.len(),
        "archive diff complete"
    );
    Ok(report)
}

fn open_zip(path: &Path) -> EngineResult<ZipArchive> {
    ZipArchive::open(path).map_err(|source| EngineError::ArchiveOpen {
        path: path.to_path_buf(),
        source,
    })
}
