//! Error types for Fskit
//!
//! Every public operation either resolves with its typed result or fails with
//! an [`Error`] whose message names the offending path and the violated
//! precondition. Backend-initialization failures never surface here: the
//! browser-store driver downgrades them to a fallback strategy internally.

use thiserror::Error;

/// Result type alias using Fskit's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Fskit error types.
///
/// The Display strings are the caller-facing messages; they are stable and
/// name the path that violated the precondition.
#[derive(Error, Debug)]
pub enum Error {
    /// A file was expected at the path but nothing is there.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Nothing exists at the path.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// A directory was expected at the path but nothing is there.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    /// The path exists but is a directory where a file was required.
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// The path exists but is a file where a directory was required.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// I/O error from the native backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed snapshot input (invalid JSON, bad base64, wrong root kind).
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Failure reported by a sandboxed host bridge.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// Browser-store persistence failure after every strategy was tried.
    #[error("store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Snapshot(err.to_string())
    }
}
