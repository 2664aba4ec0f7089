//! Fskit - cross-platform virtual filesystem with portable snapshot transfer
//!
//! One asynchronous file-operation contract ([`Driver`]) satisfied by
//! fundamentally different host environments: the native OS filesystem, a
//! WebView host reached through a [`HostBridge`], a persistent browser
//! store, and an in-memory test double. Backend-agnostic tree operations
//! ([`ops`]) and the BFT snapshot codec ([`snapshot`]) are built purely on
//! that contract, so a subtree exported on one backend imports byte-exactly
//! on any other.
//!
//! # Example
//!
//! ```rust
//! use fskit::{ops, snapshot, InMemoryDriver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = InMemoryDriver::new();
//!     ops::make_directory(&driver, "/", "docs").await?;
//!     ops::write_text_file(&driver, "/docs", "readme.md", "# hello").await?;
//!
//!     let entries = ops::list_directory(&driver, "/", "docs").await?;
//!     assert_eq!(entries[0].name, "readme.md");
//!
//!     // Snapshot the subtree and replay it into a fresh backend.
//!     let tree = snapshot::export_tree(&driver, "/", "docs").await?;
//!     let other = InMemoryDriver::new();
//!     snapshot::import_tree(&other, "/", "docs", &tree).await?;
//!     assert_eq!(
//!         ops::read_text_file(&other, "/docs", "readme.md").await?,
//!         "# hello"
//!     );
//!     Ok(())
//! }
//! ```

pub mod driver;
mod error;
pub mod ops;
pub mod path;
mod resolver;
pub mod snapshot;

pub use error::{Error, Result};

pub use driver::{
    Adapter, BackendInfo, BridgeDriver, BridgeEntry, BrowserStoreDriver, Driver, FileEntry, FsRow,
    HostBridge, InMemoryDriver, KvPersister, KvStore, MemoryKvStore, Persister, PersistenceKind,
    RowTable, FS_STORAGE_KEY,
};
#[cfg(not(target_arch = "wasm32"))]
pub use driver::{NativeDriver, SandboxFilePersister};

pub use ops::FsTreeNode;
pub use path::{DirectoryPath, FilePath};
pub use resolver::{backend_info, detect_platform, resolve_driver, set_host_bridge, Platform};
pub use snapshot::{BftEncoding, BftNode};
