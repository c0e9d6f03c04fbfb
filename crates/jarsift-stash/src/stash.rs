//! Stash of prior compiled archives.
//!
//! An incremental diff needs the previous build's archive as its old side,
//! but build pipelines overwrite that archive in place. The stash keeps a
//! copy of each archive around, keyed by file name, so the next run can
//! look up what to diff against.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::{StashError, StashResult};

/// One retained archive.
#[derive(Clone, Debug)]
pub struct StashEntry {
    /// Path of the retained copy inside the stash.
    pub path: PathBuf,
    /// File name the entry is keyed by.
    pub file_name: String,
    /// When the copy was last written.
    pub modified: SystemTime,
    /// Size of the copy in bytes.
    pub size: u64,
}

/// Result of pruning old entries.
#[derive(Clone, Debug)]
pub struct PruneReport {
    pub removed: usize,
    pub bytes_freed: u64,
}

/// Directory of retained archives, one entry per archive file name.
///
/// `retain` an archive right after it is built; `closest` returns the copy
/// to diff the next build against. Entries whose name starts with `.` are
/// in-flight temp files and never reported. Callers prune only after the
/// diff is done, so the path returned by `closest` stays on disk while it
/// is in use.
pub struct ArchiveStash {
    root: PathBuf,
}

impl ArchiveStash {
    /// Create or attach to a stash directory.
    pub fn open(root: &Path) -> StashResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The stash directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `archive` into the stash under its file name.
    ///
    /// The copy goes through a temp file and a rename. If an entry with the
    /// same name and identical content already exists, nothing is written.
    /// Returns the path of the retained copy.
    pub fn retain(&self, archive: &Path) -> StashResult<PathBuf> {
        let name = match archive.file_name().and_then(|n| n.to_str()) {
            Some(name) if archive.is_file() => name.to_owned(),
            _ => {
                return Err(StashError::NotAFile {
                    path: archive.to_path_buf(),
                })
            }
        };

        let digest = file_digest(archive)?;
        let dest = self.root.join(&name);
        if dest.is_file() && file_digest(&dest)? == digest {
            debug!(name = %name, "stash already holds this archive");
            return Ok(dest);
        }

        let tmp = self.root.join(format!(".{name}.tmp"));
        fs::copy(archive, &tmp)?;
        if let Err(e) = fs::rename(&tmp, &dest) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(
            name = %name,
            digest = %hex::encode(&digest[..4]),
            "retained archive in stash"
        );
        Ok(dest)
    }

    /// The stashed archive to diff `archive` against.
    ///
    /// Prefers the entry with the same file name, otherwise falls back to
    /// the most recently retained entry. `None` means the stash is empty
    /// and this is a first build. Only the file name of `archive` is
    /// consulted; the path itself does not have to exist.
    pub fn closest(&self, archive: &Path) -> StashResult<Option<PathBuf>> {
        let entries = self.entries()?;
        if let Some(name) = archive.file_name().and_then(|n| n.to_str()) {
            if let Some(entry) = entries.iter().find(|e| e.file_name == name) {
                return Ok(Some(entry.path.clone()));
            }
        }
        Ok(entries
            .into_iter()
            .max_by_key(|e| e.modified)
            .map(|e| e.path))
    }

    /// All retained entries, sorted by file name.
    pub fn entries(&self) -> StashResult<Vec<StashEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = %path.display(), "skipping stash entry with unrepresentable name");
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata()?;
            entries.push(StashEntry {
                path,
                file_name,
                modified: metadata.modified()?,
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    /// Delete all but the newest `keep` entries.
    pub fn prune(&self, keep: usize) -> StashResult<PruneReport> {
        let mut entries = self.entries()?;
        entries.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        let mut report = PruneReport {
            removed: 0,
            bytes_freed: 0,
        };
        for entry in entries.iter().skip(keep) {
            fs::remove_file(&entry.path)?;
            report.removed += 1;
            report.bytes_freed += entry.size;
        }
        if report.removed > 0 {
            debug!(
                removed = report.removed,
                bytes_freed = report.bytes_freed,
                "pruned archive stash"
            );
        }
        Ok(report)
    }
}

/// Streaming BLAKE3 digest of a file.
fn file_digest(path: &Path) -> std::io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(*hasher.finalize().as_bytes())
}
