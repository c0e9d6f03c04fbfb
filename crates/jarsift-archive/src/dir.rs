use std::io;
use std::path::{Component, Path, PathBuf};

use jarsift_types::ArchivePath;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{ArchiveError, ArchiveResult};
use crate::source::{Archive, UnitMeta};

/// An exploded class directory exposed as an archive.
///
/// Useful when the compiler output has not been packaged yet. Unit paths
/// are relative to the root and `/`-separated on every platform.
#[derive(Clone, Debug)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    /// Open an existing directory as an archive.
    pub fn open(root: impl Into<PathBuf>) -> ArchiveResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ArchiveError::NotAnArchive {
                reason: format!("{} is not a directory", root.display()),
            });
        }
        Ok(Self { root })
    }

    /// The directory this archive reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &ArchivePath) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(path.as_str().split('/'));
        full
    }
}

/// Convert a path relative to the root into archive form. Returns `None`
/// for components that cannot appear in a valid archive path.
fn relative_unit_path(rel: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(os) => segments.push(os.to_str()?),
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

impl Archive for DirArchive {
    fn unit_paths(&self) -> ArchiveResult<Vec<ArchivePath>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let raw = match relative_unit_path(rel) {
                Some(raw) => raw,
                None => {
                    warn!(
                        path = %entry.path().display(),
                        "skipping file with unrepresentable name"
                    );
                    continue;
                }
            };
            match ArchivePath::parse(&raw) {
                Ok(path) if path.is_class_file() => paths.push(path),
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %raw, error = %err, "skipping file with unsafe name");
                }
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn read_unit(&self, path: &ArchivePath) -> ArchiveResult<Option<Vec<u8>>> {
        match std::fs::read(self.resolve(path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn unit_meta(&self, path: &ArchivePath) -> ArchiveResult<Option<UnitMeta>> {
        match std::fs::metadata(self.resolve(path)) {
            Ok(meta) if meta.is_file() => Ok(Some(UnitMeta {
                size: meta.len(),
                crc32: None,
            })),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
