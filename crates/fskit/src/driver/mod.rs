//! Filesystem backend drivers
//!
//! Provides the async [`Driver`] contract and one implementation per host
//! environment:
//! - [`NativeDriver`]: the real OS filesystem
//! - [`BridgeDriver`]: a sandboxed WebView host reached through [`HostBridge`]
//! - [`BrowserStoreDriver`]: persistent flat-row store for browser sandboxes
//! - [`InMemoryDriver`]: test double

mod bridge;
mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;
mod persist;
mod store;
mod traits;

pub use bridge::{BridgeDriver, BridgeEntry, HostBridge};
pub use memory::InMemoryDriver;
#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeDriver;
#[cfg(not(target_arch = "wasm32"))]
pub use persist::SandboxFilePersister;
pub use persist::{KvPersister, KvStore, MemoryKvStore, Persister, RowTable};
pub use store::{BrowserStoreDriver, FsRow, FS_STORAGE_KEY};
pub use traits::{Adapter, BackendInfo, Driver, FileEntry, PersistenceKind};
