use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StashError {
    /// The path handed to `retain` is not a regular archive file with a
    /// representable file name.
    #[error("cannot stash {}: not a regular archive file", .path.display())]
    NotAFile { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StashResult<T> = Result<T, StashError>;
