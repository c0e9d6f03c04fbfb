use std::fs;
use std::path::{Path, PathBuf};

use jarsift_archive::Archive;
use jarsift_types::ArchivePath;
use tempfile::TempDir;
use tracing::debug;

use crate::classify::ClassificationMap;
use crate::diff::DiffOptions;
use crate::error::{EngineError, EngineResult};
use crate::report::DiffReport;

const SCRATCH_PREFIX: &str = "jarsift-compiled-";

/// Copy every changed unit into a fresh scratch directory.
///
/// The directory is created with a unique name under the system temp
/// directory (or `DiffOptions::scratch_root`). While it is being populated
/// it stays drop-guarded: any failure tears it down and no partial report
/// escapes. On success the guard is released and the caller owns the
/// directory.
pub fn materialize_changed(
    new: &dyn Archive,
    classifications: &ClassificationMap,
    options: &DiffOptions,
) -> EngineResult<DiffReport> {
    let scratch = create_scratch_dir(options)?;

    let changed = classifications.changed_paths();
    let unchanged = classifications.unchanged_paths();

    for path in &changed {
        let bytes = new
            .read_unit(path)?
            .ok_or_else(|| EngineError::MissingUnit(path.clone()))?;
        let dest = unit_destination(scratch.path(), path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| EngineError::Materialize {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&dest, &bytes).map_err(|source| EngineError::Materialize {
            path: dest.clone(),
            source,
        })?;
    }

    let scratch_dir = scratch.keep();
    debug!(
        units = changed.len(),
        scratch = %scratch_dir.display(),
        "materialized changed units"
    );

    Ok(DiffReport {
        changed,
        unchanged,
        scratch_dir,
    })
}

fn create_scratch_dir(options: &DiffOptions) -> EngineResult<TempDir> {
    let result = match &options.scratch_root {
        Some(root) => {
            fs::create_dir_all(root).map_err(|source| EngineError::Materialize {
                path: root.clone(),
                source,
            })?;
            tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir_in(root)
        }
        None => tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir(),
    };
    result.map_err(|source| EngineError::Materialize {
        path: options
            .scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir),
        source,
    })
}

/// Mirror a unit's relative path under the scratch root.
fn unit_destination(scratch: &Path, unit: &ArchivePath) -> PathBuf {
    let mut dest = scratch.to_path_buf();
    dest.extend(unit.as_str().split('/'));
    dest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_units;
    use jarsift_archive::InMemoryArchive;

    fn p(s: &str) -> ArchivePath {
        ArchivePath::parse(s).unwrap()
    }

    fn archive(entries: &[(&str, &[u8])]) -> InMemoryArchive {
        let mut archive = InMemoryArchive::new();
        for (path, data) in entries {
            archive.insert(p(path), data.to_vec());
        }
        archive
    }

    fn collect_files(dir: &Path, base: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                collect_files(&path, base, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                out.push(rel.to_str().unwrap().replace('\\', "/"));
            }
        }
    }

    fn scratch_files(report: &DiffReport) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(&report.scratch_dir, &report.scratch_dir, &mut files);
        files.sort();
        files
    }

    #[test]
    fn scratch_contains_exactly_the_changed_units() {
        let root = tempfile::tempdir().unwrap();
        let new = archive(&[
            ("com/a/A.class", b"alpha"),
            ("com/a/A$1.class", b"inner"),
            ("com/b/B.class", b"beta"),
        ]);
        let options = DiffOptions {
            scratch_root: Some(root.path().to_path_buf()),
            ..DiffOptions::default()
        };
        let classifications = classify_units(&new, None, &options).unwrap();

        let report = materialize_changed(&new, &classifications, &options).unwrap();
        assert_eq!(
            scratch_files(&report),
            vec!["com/a/A$1.class", "com/a/A.class", "com/b/B.class"]
        );
        assert_eq!(
            fs::read(report.scratch_dir.join("com/a/A.class")).unwrap(),
            b"alpha"
        );
    }

    #[test]
    fn unchanged_units_stay_out_of_scratch() {
        let root = tempfile::tempdir().unwrap();
        let old = archive(&[
            ("com/a/A.class", b"old"),
            ("com/b/B.class", b"same"),
        ]);
        let new = archive(&[
            ("com/a/A.class", b"new"),
            ("com/b/B.class", b"same"),
        ]);
        let options = DiffOptions {
            scratch_root: Some(root.path().to_path_buf()),
            ..DiffOptions::default()
        };
        let classifications =
            classify_units(&new, Some(&old as &dyn Archive), &options).unwrap();

        let report = materialize_changed(&new, &classifications, &options).unwrap();
        assert_eq!(scratch_files(&report), vec!["com/a/A.class"]);
        assert_eq!(report.unchanged, vec![p("com/b/B.class")]);
    }

    #[test]
    fn clean_diff_yields_empty_scratch() {
        let root = tempfile::tempdir().unwrap();
        let entries: &[(&str, &[u8])] = &[("com/a/A.class", b"same")];
        let new = archive(entries);
        let old = archive(entries);
        let options = DiffOptions {
            scratch_root: Some(root.path().to_path_buf()),
            ..DiffOptions::default()
        };
        let classifications =
            classify_units(&new, Some(&old as &dyn Archive), &options).unwrap();

        let report = materialize_changed(&new, &classifications, &options).unwrap();
        assert!(report.is_clean());
        assert!(report.scratch_dir.is_dir());
        assert!(scratch_files(&report).is_empty());
    }

    #[test]
    fn scratch_name_carries_prefix_and_lives_under_root() {
        let root = tempfile::tempdir().unwrap();
        let new = archive(&[("A.class", b"a")]);
        let options = DiffOptions {
            scratch_root: Some(root.path().to_path_buf()),
            ..DiffOptions::default()
        };
        let classifications = classify_units(&new, None, &options).unwrap();

        let report = materialize_changed(&new, &classifications, &options).unwrap();
        assert_eq!(report.scratch_dir.parent(), Some(root.path()));
        let name = report.scratch_dir.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("jarsift-compiled-"));
    }

    #[test]
    fn unusable_scratch_root_is_materialize_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocked");
        fs::write(&blocker, b"a file, not a directory").unwrap();

        let new = archive(&[("A.class", b"a")]);
        let options = DiffOptions {
            scratch_root: Some(blocker),
            ..DiffOptions::default()
        };
        let classifications = classify_units(&new, None, &options).unwrap();

        let err = materialize_changed(&new, &classifications, &options).unwrap_err();
        assert!(matches!(err, EngineError::Materialize { .. }));
    }

    #[test]
    fn copy_conflict_discards_scratch_directory() {
        let root = tempfile::tempdir().unwrap();
        // "x.class" materializes as a file, then "x.class/y.class" needs it
        // to be a directory; the copy fails and the guard must clean up.
        let new = archive(&[("x.class", b"file"), ("x.class/y.class", b"nested")]);
        let options = DiffOptions {
            scratch_root: Some(root.path().to_path_buf()),
            ..DiffOptions::default()
        };
        let classifications = classify_units(&new, None, &options).unwrap();

        let err = materialize_changed(&new, &classifications, &options).unwrap_err();
        assert!(matches!(err, EngineError::Materialize { .. }));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
