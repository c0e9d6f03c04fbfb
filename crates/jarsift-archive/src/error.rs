use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not a class archive: {reason}")]
    NotAnArchive { reason: String },

    #[error("archive truncated at offset {offset}: {reason}")]
    Truncated { offset: u64, reason: String },

    #[error("unsupported archive feature: {0}")]
    Unsupported(String),

    #[error("corrupt entry {name} at offset {offset}: {reason}")]
    CorruptEntry {
        name: String,
        offset: u64,
        reason: String,
    },

    #[error("CRC32 mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("decompression failed for {name}: {reason}")]
    Decompression { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
