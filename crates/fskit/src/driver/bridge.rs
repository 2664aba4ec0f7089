//! Sandboxed-host bridge driver
//!
//! WebView-hosted deployments have no filesystem of their own; the host
//! process exposes one through a typed capability object. [`BridgeDriver`]
//! adapts that capability to the [`Driver`] contract: virtual `/`-rooted
//! paths on the outside, host paths under a base directory on the inside.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::traits::{Adapter, BackendInfo, Driver, FileEntry};
use crate::error::Result;
use crate::path::{self, DirectoryPath, FilePath};

/// Directory entry as reported by the host, in wire form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEntry {
    pub name: String,
    /// Host-side absolute path.
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    /// Milliseconds since the epoch; `None` when the host cannot say.
    pub mtime_ms: Option<i64>,
}

/// Capability contract a sandboxed host must provide.
///
/// All paths are host-side absolute paths; the driver performs the
/// virtual-to-host mapping before calling in. Errors are surfaced
/// verbatim, so hosts are expected to report the shared taxonomy.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Host directory all virtual paths are rooted under.
    async fn base_dir(&self) -> Result<String>;

    async fn read_file(&self, host_path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, host_path: &str, data: &[u8]) -> Result<()>;
    async fn readdir(&self, host_path: &str) -> Result<Vec<BridgeEntry>>;
    async fn stat(&self, host_path: &str) -> Result<BridgeEntry>;
    async fn mkdir(&self, host_path: &str) -> Result<()>;
    async fn rm(&self, host_path: &str) -> Result<()>;
    async fn exists(&self, host_path: &str) -> Result<bool>;
}

/// Driver backed by a sandboxed host's filesystem capability.
pub struct BridgeDriver {
    bridge: Arc<dyn HostBridge>,
    base_dir: OnceCell<String>,
}

impl BridgeDriver {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self {
            bridge,
            base_dir: OnceCell::new(),
        }
    }

    /// Host base directory, fetched once and reused.
    async fn base_dir(&self) -> Result<&str> {
        self.base_dir
            .get_or_try_init(|| async {
                let base = self.bridge.base_dir().await?;
                Ok(base.trim_end_matches('/').to_string())
            })
            .await
            .map(String::as_str)
    }

    async fn to_host_path(&self, virtual_path: &str) -> Result<String> {
        let base = self.base_dir().await?;
        if virtual_path == "/" {
            Ok(base.to_string())
        } else {
            Ok(format!("{base}{virtual_path}"))
        }
    }

    fn to_virtual_path(base: &str, host_path: &str) -> String {
        match host_path.strip_prefix(base) {
            Some("") | None => "/".to_string(),
            Some(rel) => path::normalize(rel),
        }
    }

    async fn entry_for(&self, wire: BridgeEntry) -> Result<FileEntry> {
        let base = self.base_dir().await?;
        let mtime = wire
            .mtime_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);
        Ok(FileEntry {
            name: wire.name,
            path: Self::to_virtual_path(base, &wire.path),
            is_directory: wire.is_directory,
            size: wire.size,
            mtime,
        })
    }
}

#[async_trait]
impl Driver for BridgeDriver {
    async fn read_file(&self, file_path: &FilePath) -> Result<Vec<u8>> {
        let host_path = self.to_host_path(file_path.as_str()).await?;
        self.bridge.read_file(&host_path).await
    }

    async fn write_file(&self, file_path: &FilePath, data: &[u8]) -> Result<()> {
        let host_path = self.to_host_path(file_path.as_str()).await?;
        self.bridge.write_file(&host_path, data).await
    }

    async fn readdir(&self, dir_path: &DirectoryPath) -> Result<Vec<FileEntry>> {
        let host_path = self.to_host_path(dir_path.as_str()).await?;
        let wire_entries = self.bridge.readdir(&host_path).await?;
        let mut entries = Vec::with_capacity(wire_entries.len());
        for wire in wire_entries {
            entries.push(self.entry_for(wire).await?);
        }
        Ok(entries)
    }

    async fn stat(&self, file_path: &FilePath) -> Result<FileEntry> {
        let host_path = self.to_host_path(file_path.as_str()).await?;
        let wire = self.bridge.stat(&host_path).await?;
        self.entry_for(wire).await
    }

    async fn mkdir(&self, dir_path: &DirectoryPath) -> Result<()> {
        let host_path = self.to_host_path(dir_path.as_str()).await?;
        self.bridge.mkdir(&host_path).await
    }

    async fn rm(&self, file_path: &FilePath) -> Result<()> {
        let host_path = self.to_host_path(file_path.as_str()).await?;
        self.bridge.rm(&host_path).await
    }

    async fn exists(&self, file_path: &FilePath) -> Result<bool> {
        let host_path = self.to_host_path(file_path.as_str()).await?;
        self.bridge.exists(&host_path).await
    }

    async fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            adapter: Adapter::HostBridge,
            persistence: None,
            base_dir: self.base_dir().await.ok().map(str::to_string),
        }
    }
}
