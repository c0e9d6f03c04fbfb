use thiserror::Error;

/// Errors produced by archive path validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty archive path")]
    Empty,

    #[error("absolute path not allowed: {0}")]
    Absolute(String),

    #[error("backslash separator not allowed: {0}")]
    Backslash(String),

    #[error("empty segment in path: {0}")]
    EmptySegment(String),

    #[error("relative segment in path: {0}")]
    RelativeSegment(String),

    #[error("trailing slash in path: {0}")]
    TrailingSlash(String),
}
