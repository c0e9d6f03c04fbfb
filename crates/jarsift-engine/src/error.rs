use std::path::PathBuf;

use jarsift_archive::ArchiveError;
use jarsift_types::ArchivePath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// An input archive could not be opened. Fatal to the whole diff.
    #[error("failed to open archive {}: {source}", .path.display())]
    ArchiveOpen {
        path: PathBuf,
        source: ArchiveError,
    },

    /// An already-open archive failed mid-diff.
    #[error("archive read failed: {0}")]
    Archive(#[from] ArchiveError),

    /// Copying changed units into the scratch directory failed. Fatal; the
    /// partially-built scratch directory is discarded.
    #[error("materialization failed at {}: {source}", .path.display())]
    Materialize {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An enumerated unit vanished between listing and reading.
    #[error("unit {0} vanished from archive during diff")]
    MissingUnit(ArchivePath),

    /// A diff manifest could not be serialized or parsed.
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
