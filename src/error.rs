// src/error.rs

//! Error types for packsync
//!
//! Filesystem failures are fatal for the current run: the engine halts at
//! the failing operation and leaves the tree in whatever intermediate state
//! it reached. A managed, overlay, or discard path that simply does not
//! exist is not an error; those are handled as no-ops at the call site so
//! that a run can safely be repeated.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Underlying filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem failure with added context
    #[error("{0}")]
    IoError(String),

    /// The release archive cannot be opened or an entry cannot be read
    #[error("archive error: {0}")]
    ArchiveError(String),

    /// An archive entry attempted to escape the installation tree
    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    /// A path was empty or otherwise unusable after normalization
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// HTTP download of a release archive failed
    #[error("download failed: {0}")]
    DownloadError(String),

    /// A required file or directory could not be found
    #[error("{0}")]
    NotFoundError(String),

    /// A profile or state file could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// A component could not be initialized
    #[error("initialization failed: {0}")]
    InitError(String),
}
