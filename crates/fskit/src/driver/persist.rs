//! Persistence strategies for the browser-store driver
//!
//! The store driver keeps its row table in memory and delegates durability
//! to the first [`Persister`] in an ordered strategy list that works:
//! a JSON snapshot file inside the sandbox's private storage area, then a
//! key/value store. Strategy failures are logged and skipped, never
//! surfaced to filesystem callers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::store::FsRow;
use super::traits::PersistenceKind;
use crate::error::Result;

/// Flat row table keyed by absolute path.
pub type RowTable = HashMap<String, FsRow>;

/// Durability strategy for a [`super::BrowserStoreDriver`] row table.
#[async_trait]
pub trait Persister: Send + Sync {
    fn kind(&self) -> PersistenceKind;

    /// Load the persisted table. `Ok(None)` means nothing was saved yet.
    ///
    /// Rows that fail to decode are dropped rather than failing the load;
    /// only an unreadable or structurally invalid snapshot is an error.
    async fn load(&self) -> Result<Option<RowTable>>;

    /// Persist the full table.
    async fn save(&self, rows: &RowTable) -> Result<()>;
}

/// Decode a persisted snapshot, dropping rows that no longer parse.
fn decode_rows(raw: &str) -> Result<RowTable> {
    let values: HashMap<String, serde_json::Value> = serde_json::from_str(raw)?;
    Ok(values
        .into_iter()
        .filter_map(|(row_path, value)| {
            serde_json::from_value::<FsRow>(value)
                .ok()
                .map(|row| (row_path, row))
        })
        .collect())
}

/// JSON snapshot file in a private storage directory.
///
/// The file is named `{storage_key}.json` under the base directory, the
/// same naming the browser sandbox uses for its origin-private file.
#[cfg(not(target_arch = "wasm32"))]
pub struct SandboxFilePersister {
    file_path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl SandboxFilePersister {
    pub fn new(base_dir: impl Into<std::path::PathBuf>, storage_key: &str) -> Self {
        Self {
            file_path: base_dir.into().join(format!("{storage_key}.json")),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl Persister for SandboxFilePersister {
    fn kind(&self) -> PersistenceKind {
        PersistenceKind::SandboxFile
    }

    async fn load(&self) -> Result<Option<RowTable>> {
        // Acquiring the storage area happens here: if the directory cannot
        // be created, the strategy fails and the driver falls back.
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match tokio::fs::read_to_string(&self.file_path).await {
            Ok(raw) => Ok(Some(decode_rows(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, rows: &RowTable) -> Result<()> {
        let raw = serde_json::to_string(rows)?;
        Ok(tokio::fs::write(&self.file_path, raw).await?)
    }
}

/// Key/value storage a [`KvPersister`] writes through.
///
/// Browser deployments back this with origin storage; tests and native
/// fallbacks use [`MemoryKvStore`].
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory [`KvStore`].
#[derive(Default)]
pub struct MemoryKvStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.map.write().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.map.write().unwrap().remove(key);
    }
}

/// Key/value fallback persister: the whole table as one JSON value under
/// the storage key.
pub struct KvPersister {
    store: std::sync::Arc<dyn KvStore>,
    storage_key: String,
}

impl KvPersister {
    pub fn new(store: std::sync::Arc<dyn KvStore>, storage_key: impl Into<String>) -> Self {
        Self {
            store,
            storage_key: storage_key.into(),
        }
    }
}

#[async_trait]
impl Persister for KvPersister {
    fn kind(&self) -> PersistenceKind {
        PersistenceKind::KeyValue
    }

    async fn load(&self) -> Result<Option<RowTable>> {
        match self.store.get(&self.storage_key) {
            Some(raw) => Ok(Some(decode_rows(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, rows: &RowTable) -> Result<()> {
        self.store.set(&self.storage_key, serde_json::to_string(rows)?);
        Ok(())
    }
}
