//! Driver trait definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::{DirectoryPath, FilePath};

/// Async filesystem driver.
///
/// One implementation per host environment; every backend must present the
/// same observable behavior (path semantics, error conditions) so the tree
/// operations in [`crate::ops`] stay backend-agnostic.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Read a file's contents.
    ///
    /// Fails with `File not found` if nothing is at the path or the path is
    /// a directory.
    async fn read_file(&self, path: &FilePath) -> Result<Vec<u8>>;

    /// Create or overwrite a file.
    ///
    /// Missing parent directories are not created; callers needing that
    /// call [`Driver::mkdir`] first. The browser-store backend's internal
    /// writer is the one exception and auto-creates ancestors.
    async fn write_file(&self, path: &FilePath, data: &[u8]) -> Result<()>;

    /// Read directory entries.
    ///
    /// Fails with `Directory not found` if the path is missing or is a file.
    async fn readdir(&self, path: &DirectoryPath) -> Result<Vec<FileEntry>>;

    /// Get metadata for a path of either kind.
    ///
    /// Fails with `Path not found` if nothing is there.
    async fn stat(&self, path: &FilePath) -> Result<FileEntry>;

    /// Create a directory, including missing ancestors.
    ///
    /// Idempotent: creating an existing directory is a no-op.
    async fn mkdir(&self, path: &DirectoryPath) -> Result<()>;

    /// Remove exactly the given node (non-recursive).
    ///
    /// Fails with `Path not found` if nothing is there. Recursion lives in
    /// [`crate::ops::remove_recursive`].
    async fn rm(&self, path: &FilePath) -> Result<()>;

    /// Check whether anything exists at the path. Never fails on absence.
    async fn exists(&self, path: &FilePath) -> Result<bool>;

    /// Diagnostics about the backing storage.
    async fn backend_info(&self) -> BackendInfo;
}

/// Metadata for a single file or directory.
///
/// Always derived from backend state, never persisted independently. The
/// path is absolute within the backend's own path space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Entry name (last path segment).
    pub name: String,
    /// Absolute path of the entry.
    pub path: String,
    pub is_directory: bool,
    /// Size in bytes; 0 for directories on virtual backends.
    pub size: u64,
    /// Last modification time.
    pub mtime: DateTime<Utc>,
}

/// Which backend implementation is serving a driver handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Adapter {
    Native,
    HostBridge,
    BrowserStore,
    Memory,
}

/// Persistence strategy selected by the browser-store driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistenceKind {
    /// JSON snapshot file inside the sandbox's private storage area.
    SandboxFile,
    /// Key/value store fallback.
    KeyValue,
}

/// Diagnostic description of a driver's backing storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    pub adapter: Adapter,
    /// Persistence strategy, for the browser-store backend only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceKind>,
    /// Host directory all virtual paths map under, for bridge backends only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
}

impl BackendInfo {
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            persistence: None,
            base_dir: None,
        }
    }
}
