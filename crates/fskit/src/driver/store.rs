//! Browser-store driver
//!
//! Backend for browser sandboxes with no real filesystem: every node is a
//! row in a flat table keyed by absolute path, and durability comes from
//! the first [`Persister`] strategy that works (sandbox file, then
//! key/value). The fallback is silent apart from a diagnostic warning;
//! callers never see an initialization error from it.
//!
//! This is the one backend whose internal writer auto-creates missing
//! ancestor directories: every non-root row's ancestors are guaranteed to
//! exist as rows (mkdir -p semantics maintained by the driver, not by
//! callers).

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::OnceCell;

use super::persist::{KvPersister, MemoryKvStore, Persister, RowTable};
use super::traits::{Adapter, BackendInfo, Driver, FileEntry};
use crate::error::{Error, Result};
use crate::path::{self, DirectoryPath, FilePath};

/// Storage key for the persisted row table.
pub const FS_STORAGE_KEY: &str = "fskit.fs.v1";

/// Persisted row: one file or directory node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsRow {
    /// Entry name (last path segment).
    pub name: String,
    /// 1 for directories, 0 for files.
    pub is_directory: u8,
    pub size: u64,
    /// ISO-8601 modification time.
    pub mtime: String,
    /// Base64 content; empty for directories.
    pub data: String,
}

impl FsRow {
    pub fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_directory: 1,
            size: 0,
            mtime: now_iso(),
            data: String::new(),
        }
    }

    pub fn file(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            is_directory: 0,
            size: data.len() as u64,
            mtime: now_iso(),
            data: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    fn mtime_utc(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.mtime)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Driver for browser sandboxes, backed by a persisted flat row table.
pub struct BrowserStoreDriver {
    table: RwLock<RowTable>,
    selected: OnceCell<Box<dyn Persister>>,
    candidates: Mutex<Vec<Box<dyn Persister>>>,
}

/// Configuration for [`BrowserStoreDriver`].
pub struct BrowserStoreBuilder {
    storage_key: String,
    #[cfg(not(target_arch = "wasm32"))]
    base_dir: Option<std::path::PathBuf>,
    strategies: Option<Vec<Box<dyn Persister>>>,
}

impl Default for BrowserStoreBuilder {
    fn default() -> Self {
        Self {
            storage_key: FS_STORAGE_KEY.to_string(),
            #[cfg(not(target_arch = "wasm32"))]
            base_dir: None,
            strategies: None,
        }
    }
}

impl BrowserStoreBuilder {
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Private storage directory for the sandbox-file strategy.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn base_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Replace the default strategy chain entirely.
    pub fn strategies(mut self, strategies: Vec<Box<dyn Persister>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn build(self) -> BrowserStoreDriver {
        let candidates = self.strategies.unwrap_or_else(|| {
            let mut chain: Vec<Box<dyn Persister>> = Vec::new();

            #[cfg(not(target_arch = "wasm32"))]
            {
                let base_dir = self
                    .base_dir
                    .unwrap_or_else(|| std::env::temp_dir().join("fskit"));
                chain.push(Box::new(super::persist::SandboxFilePersister::new(
                    base_dir,
                    &self.storage_key,
                )));
            }

            chain.push(Box::new(KvPersister::new(
                Arc::new(MemoryKvStore::new()),
                self.storage_key.as_str(),
            )));
            chain
        });

        BrowserStoreDriver {
            table: RwLock::new(RowTable::new()),
            selected: OnceCell::new(),
            candidates: Mutex::new(candidates),
        }
    }
}

impl Default for BrowserStoreDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserStoreDriver {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BrowserStoreBuilder {
        BrowserStoreBuilder::default()
    }

    /// Select a persistence strategy once; concurrent first callers await
    /// the same initialization.
    async fn persister(&self) -> Result<&dyn Persister> {
        let selected = self
            .selected
            .get_or_try_init(|| async {
                let candidates: Vec<Box<dyn Persister>> =
                    self.candidates.lock().unwrap().drain(..).collect();

                for persister in candidates {
                    match self.adopt_strategy(persister.as_ref()).await {
                        Ok(()) => {
                            tracing::debug!(kind = ?persister.kind(), "browser store persistence ready");
                            return Ok(persister);
                        }
                        Err(err) => {
                            tracing::warn!(
                                kind = ?persister.kind(),
                                error = %err,
                                "persistence strategy failed, trying next"
                            );
                        }
                    }
                }

                Err(Error::Store(
                    "no persistence strategy available".to_string(),
                ))
            })
            .await?;
        Ok(selected.as_ref())
    }

    /// Load through a candidate strategy, seed demo content if the table is
    /// empty, and save back. Any failure rejects the candidate.
    async fn adopt_strategy(&self, persister: &dyn Persister) -> Result<()> {
        let loaded = persister.load().await?;
        let snapshot = {
            let mut table = self.table.write().unwrap();
            *table = loaded.unwrap_or_default();
            seed_if_empty(&mut table);
            table.clone()
        };
        persister.save(&snapshot).await
    }

    /// Refresh the in-memory table from storage before a read.
    async fn reload(&self) -> Result<()> {
        let persister = self.persister().await?;
        if let Some(rows) = persister.load().await? {
            *self.table.write().unwrap() = rows;
        }
        Ok(())
    }

    /// Persist the in-memory table after a mutation.
    async fn flush(&self) -> Result<()> {
        let persister = self.persister().await?;
        let snapshot = self.table.read().unwrap().clone();
        persister.save(&snapshot).await
    }

    fn entry_for(row_path: &str, row: &FsRow) -> FileEntry {
        FileEntry {
            name: row.name.clone(),
            path: row_path.to_string(),
            is_directory: row.is_directory == 1,
            size: row.size,
            mtime: row.mtime_utc(),
        }
    }
}

fn seed_if_empty(table: &mut RowTable) {
    if !table.is_empty() {
        return;
    }

    table.insert("/".to_string(), FsRow::directory("/"));
    for dir in [
        "/src",
        "/tests",
        "/tests/fixtures",
        "/tests/fixtures/sample-files",
    ] {
        table.insert(dir.to_string(), FsRow::directory(&path::basename(dir)));
    }

    let seed_files = [
        ("/README.md", "# fskit\nBrowser demo filesystem"),
        ("/notes.txt", "Files here persist in the browser sandbox."),
        ("/src/main.rs", "fn main() {\n    println!(\"hello\");\n}\n"),
        ("/tests/fixtures/sample-files/hello.txt", "Hello, World!"),
    ];
    for (file_path, content) in seed_files {
        table.insert(
            file_path.to_string(),
            FsRow::file(&path::basename(file_path), content.as_bytes()),
        );
    }
}

/// Walk the path from the root, creating any missing ancestor directory
/// row. A segment already present as a file is a conflict.
fn ensure_directory_rows(table: &mut RowTable, target: &str) -> Result<()> {
    if target == "/" {
        if !table.contains_key("/") {
            table.insert("/".to_string(), FsRow::directory("/"));
        }
        return Ok(());
    }

    let mut current = String::new();
    for segment in path::split_segments(target) {
        current.push('/');
        current.push_str(segment);
        match table.get(&current) {
            Some(row) if row.is_directory == 1 => {}
            Some(_) => return Err(Error::NotADirectory(current)),
            None => {
                table.insert(current.clone(), FsRow::directory(segment));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Driver for BrowserStoreDriver {
    async fn read_file(&self, file_path: &FilePath) -> Result<Vec<u8>> {
        self.reload().await?;
        let table = self.table.read().unwrap();
        match table.get(file_path.as_str()) {
            Some(row) if row.is_directory == 1 => Err(Error::NotAFile(file_path.to_string())),
            Some(row) => Ok(base64::engine::general_purpose::STANDARD.decode(&row.data)?),
            None => Err(Error::FileNotFound(file_path.to_string())),
        }
    }

    async fn write_file(&self, file_path: &FilePath, data: &[u8]) -> Result<()> {
        self.persister().await?;
        {
            let mut table = self.table.write().unwrap();
            if let Some(row) = table.get(file_path.as_str()) {
                if row.is_directory == 1 {
                    return Err(Error::NotAFile(file_path.to_string()));
                }
            }
            ensure_directory_rows(&mut table, &path::parent(file_path.as_str()))?;
            table.insert(
                file_path.to_string(),
                FsRow::file(&path::basename(file_path.as_str()), data),
            );
        }
        self.flush().await
    }

    async fn readdir(&self, dir_path: &DirectoryPath) -> Result<Vec<FileEntry>> {
        self.reload().await?;
        let table = self.table.read().unwrap();
        match table.get(dir_path.as_str()) {
            Some(row) if row.is_directory == 1 => {}
            _ => return Err(Error::DirectoryNotFound(dir_path.to_string())),
        }

        let prefix = if dir_path.as_str() == "/" {
            "/".to_string()
        } else {
            format!("{dir_path}/")
        };

        // One segment deep: prefix match over every row, then reject any
        // remainder that still contains a separator. No parent index.
        Ok(table
            .iter()
            .filter(|(row_path, _)| {
                row_path.as_str() != dir_path.as_str() && row_path.starts_with(&prefix)
            })
            .filter(|(row_path, _)| {
                let rel = &row_path[prefix.len()..];
                !rel.is_empty() && !rel.contains('/')
            })
            .map(|(row_path, row)| BrowserStoreDriver::entry_for(row_path, row))
            .collect())
    }

    async fn stat(&self, file_path: &FilePath) -> Result<FileEntry> {
        self.reload().await?;
        let table = self.table.read().unwrap();
        table
            .get(file_path.as_str())
            .map(|row| Self::entry_for(file_path.as_str(), row))
            .ok_or_else(|| Error::PathNotFound(file_path.to_string()))
    }

    async fn mkdir(&self, dir_path: &DirectoryPath) -> Result<()> {
        self.persister().await?;
        {
            let mut table = self.table.write().unwrap();
            ensure_directory_rows(&mut table, dir_path.as_str())?;
        }
        self.flush().await
    }

    async fn rm(&self, file_path: &FilePath) -> Result<()> {
        self.persister().await?;
        {
            let mut table = self.table.write().unwrap();
            if table.remove(file_path.as_str()).is_none() {
                return Err(Error::PathNotFound(file_path.to_string()));
            }
        }
        self.flush().await
    }

    async fn exists(&self, file_path: &FilePath) -> Result<bool> {
        self.reload().await?;
        Ok(self.table.read().unwrap().contains_key(file_path.as_str()))
    }

    async fn backend_info(&self) -> BackendInfo {
        let persistence = self.persister().await.ok().map(Persister::kind);
        BackendInfo {
            adapter: Adapter::BrowserStore,
            persistence,
            base_dir: None,
        }
    }
}
