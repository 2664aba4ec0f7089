//! Tree operations
//!
//! Generic recursive algorithms over the [`Driver`] contract: listing,
//! reading, copying, moving, removing, and tree rendering work the same on
//! every backend. Recursive walks issue driver calls sequentially, so
//! latency for large trees scales with tree size times per-call latency.

use futures_util::future::{BoxFuture, FutureExt};
use std::cmp::Ordering;

use crate::driver::{Driver, FileEntry};
use crate::error::{Error, Result};
use crate::path::{self, DirectoryPath, FilePath};

/// Transient tree built by [`build_tree`]; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FsTreeNode {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    /// Empty for files.
    pub children: Vec<FsTreeNode>,
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Shared sort order: directories before files, then case-aware
/// lexicographic by name.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| compare_names(&a.name, &b.name))
    });
}

/// Resolve and list a directory, sorted.
pub async fn list_directory(
    driver: &dyn Driver,
    cwd: &str,
    requested: &str,
) -> Result<Vec<FileEntry>> {
    let target = path::resolve(cwd, requested);
    let mut entries = driver.readdir(&DirectoryPath::new(&target)).await?;
    sort_entries(&mut entries);
    Ok(entries)
}

/// Resolve a target directory for `cd`, failing on files.
pub async fn change_dir(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<String> {
    let target = path::resolve(cwd, requested);
    let entry = driver.stat(&FilePath::new(&target)).await?;
    if !entry.is_directory {
        return Err(Error::NotADirectory(requested.to_string()));
    }
    Ok(target)
}

/// Read a file as text (lossy UTF-8).
pub async fn read_text_file(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<String> {
    let data = read_bytes_file(driver, cwd, requested).await?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Read a file's raw bytes.
pub async fn read_bytes_file(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<Vec<u8>> {
    let target = path::resolve(cwd, requested);
    let entry = driver.stat(&FilePath::new(&target)).await?;
    if entry.is_directory {
        return Err(Error::NotAFile(requested.to_string()));
    }
    driver.read_file(&FilePath::new(&target)).await
}

/// Write text content, returning the resolved path.
pub async fn write_text_file(
    driver: &dyn Driver,
    cwd: &str,
    requested: &str,
    content: &str,
) -> Result<String> {
    write_bytes_file(driver, cwd, requested, content.as_bytes()).await
}

/// Write raw bytes, returning the resolved path.
pub async fn write_bytes_file(
    driver: &dyn Driver,
    cwd: &str,
    requested: &str,
    data: &[u8],
) -> Result<String> {
    let target = path::resolve(cwd, requested);
    driver.write_file(&FilePath::new(&target), data).await?;
    Ok(target)
}

/// Create the file if absent; leave an existing file untouched.
///
/// Fails when the target exists and is a directory.
pub async fn touch_file(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<String> {
    let target = path::resolve(cwd, requested);
    if driver.exists(&FilePath::new(&target)).await? {
        let entry = driver.stat(&FilePath::new(&target)).await?;
        if entry.is_directory {
            return Err(Error::NotAFile(requested.to_string()));
        }
        return Ok(target);
    }
    driver.write_file(&FilePath::new(&target), &[]).await?;
    Ok(target)
}

/// Create a directory (idempotent), returning the resolved path.
pub async fn make_directory(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<String> {
    let target = path::resolve(cwd, requested);
    driver.mkdir(&DirectoryPath::new(&target)).await?;
    Ok(target)
}

/// Depth-first removal of an absolute path.
///
/// Children are removed before their directory. Not transactional: a
/// failure partway leaves a partially-deleted tree.
pub fn remove_recursive<'a>(driver: &'a dyn Driver, target: String) -> BoxFuture<'a, Result<()>> {
    async move {
        let entry = driver.stat(&FilePath::new(&target)).await?;
        if entry.is_directory {
            let mut children = driver.readdir(&DirectoryPath::new(&target)).await?;
            sort_entries(&mut children);
            for child in children {
                remove_recursive(driver, path::join(&target, &child.name)).await?;
            }
        }
        driver.rm(&FilePath::new(&target)).await
    }
    .boxed()
}

/// Recursive copy between absolute paths.
///
/// Files are buffered whole in memory; no streaming.
pub fn copy_recursive<'a>(
    driver: &'a dyn Driver,
    source: String,
    dest: String,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let entry = driver.stat(&FilePath::new(&source)).await?;
        if entry.is_directory {
            driver.mkdir(&DirectoryPath::new(&dest)).await?;
            let mut children = driver.readdir(&DirectoryPath::new(&source)).await?;
            sort_entries(&mut children);
            for child in children {
                copy_recursive(
                    driver,
                    path::join(&source, &child.name),
                    path::join(&dest, &child.name),
                )
                .await?;
            }
            return Ok(());
        }

        let data = driver.read_file(&FilePath::new(&source)).await?;
        driver.write_file(&FilePath::new(&dest), &data).await
    }
    .boxed()
}

/// Recursively remove a path, returning the resolved path.
pub async fn remove_path(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<String> {
    let target = path::resolve(cwd, requested);
    remove_recursive(driver, target.clone()).await?;
    Ok(target)
}

/// Recursively copy `source` to `dest`, returning both resolved paths.
pub async fn copy_path(
    driver: &dyn Driver,
    cwd: &str,
    source: &str,
    dest: &str,
) -> Result<(String, String)> {
    let source_path = path::resolve(cwd, source);
    let dest_path = path::resolve(cwd, dest);
    copy_recursive(driver, source_path.clone(), dest_path.clone()).await?;
    Ok((source_path, dest_path))
}

/// Move `source` to `dest` as copy-then-delete, returning both resolved
/// paths.
///
/// Known limitation: not atomic. A failure between the copy and the delete
/// leaves both paths present with identical content (duplication, never
/// loss).
pub async fn move_path(
    driver: &dyn Driver,
    cwd: &str,
    source: &str,
    dest: &str,
) -> Result<(String, String)> {
    let source_path = path::resolve(cwd, source);
    let dest_path = path::resolve(cwd, dest);
    copy_recursive(driver, source_path.clone(), dest_path.clone()).await?;
    remove_recursive(driver, source_path.clone()).await?;
    Ok((source_path, dest_path))
}

/// Resolve and stat a path, returning both.
pub async fn stat_path(
    driver: &dyn Driver,
    cwd: &str,
    requested: &str,
) -> Result<(String, FileEntry)> {
    let target = path::resolve(cwd, requested);
    let entry = driver.stat(&FilePath::new(&target)).await?;
    Ok((target, entry))
}

/// Recursive descent over a directory producing an [`FsTreeNode`].
pub async fn build_tree(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<FsTreeNode> {
    let root_path = path::resolve(cwd, requested);
    let root = driver.stat(&FilePath::new(&root_path)).await?;
    if !root.is_directory {
        return Err(Error::NotADirectory(requested.to_string()));
    }

    let root_name = path::basename(&root_path);
    walk(driver, root_path, root_name).await
}

fn walk<'a>(
    driver: &'a dyn Driver,
    dir_path: String,
    name: String,
) -> BoxFuture<'a, Result<FsTreeNode>> {
    async move {
        let mut entries = driver.readdir(&DirectoryPath::new(&dir_path)).await?;
        sort_entries(&mut entries);

        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let child_path = path::join(&dir_path, &entry.name);
            if entry.is_directory {
                children.push(walk(driver, child_path, entry.name).await?);
            } else {
                children.push(FsTreeNode {
                    name: entry.name,
                    path: child_path,
                    is_directory: false,
                    children: Vec::new(),
                });
            }
        }

        Ok(FsTreeNode {
            name,
            path: dir_path,
            is_directory: true,
            children,
        })
    }
    .boxed()
}

/// Box-drawing rendering of a directory tree.
pub async fn tree_text(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<String> {
    let tree = build_tree(driver, cwd, requested).await?;
    let mut lines = vec![format!("{}/", tree.name)];
    render(&tree, "", &mut lines);
    Ok(lines.join("\n"))
}

fn render(node: &FsTreeNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (index, child) in node.children.iter().enumerate() {
        let is_last = index + 1 == count;
        let branch = if is_last { "└── " } else { "├── " };
        let suffix = if child.is_directory { "/" } else { "" };
        lines.push(format!("{prefix}{branch}{}{suffix}", child.name));
        if child.is_directory {
            let pad = if is_last { "    " } else { "│   " };
            render(child, &format!("{prefix}{pad}"), lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BackendInfo, InMemoryDriver};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    async fn sample_driver() -> InMemoryDriver {
        let driver = InMemoryDriver::new();
        make_directory(&driver, "/", "Docs").await.unwrap();
        make_directory(&driver, "/", "src").await.unwrap();
        write_text_file(&driver, "/", "A.txt", "alpha").await.unwrap();
        write_text_file(&driver, "/", "b.txt", "beta").await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_sort_directories_first_then_names() {
        let driver = sample_driver().await;
        let names: Vec<String> = list_directory(&driver, "/", ".")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["Docs", "src", "A.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_change_dir_rejects_files() {
        let driver = sample_driver().await;
        let target = change_dir(&driver, "/", "Docs").await.unwrap();
        assert_eq!(target, "/Docs");

        let err = change_dir(&driver, "/", "A.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "Not a directory: A.txt");
    }

    #[tokio::test]
    async fn test_read_text_resolves_relative_paths() {
        let driver = sample_driver().await;
        write_text_file(&driver, "/Docs", "guide.md", "# guide")
            .await
            .unwrap();

        let content = read_text_file(&driver, "/Docs", "guide.md").await.unwrap();
        assert_eq!(content, "# guide");

        let content = read_text_file(&driver, "/src", "../Docs/guide.md")
            .await
            .unwrap();
        assert_eq!(content, "# guide");
    }

    #[tokio::test]
    async fn test_read_text_rejects_directories() {
        let driver = sample_driver().await;
        let err = read_text_file(&driver, "/", "Docs").await.unwrap_err();
        assert_eq!(err.to_string(), "Not a file: Docs");
    }

    #[tokio::test]
    async fn test_touch_is_idempotent() {
        let driver = sample_driver().await;

        // Existing content is left untouched.
        touch_file(&driver, "/", "A.txt").await.unwrap();
        assert_eq!(read_text_file(&driver, "/", "A.txt").await.unwrap(), "alpha");

        // Absent target becomes a zero-length file.
        let created = touch_file(&driver, "/", "empty.txt").await.unwrap();
        assert_eq!(created, "/empty.txt");
        assert_eq!(
            read_bytes_file(&driver, "/", "empty.txt").await.unwrap(),
            Vec::<u8>::new()
        );

        // Directories are rejected.
        let err = touch_file(&driver, "/", "Docs").await.unwrap_err();
        assert_eq!(err.to_string(), "Not a file: Docs");
    }

    async fn deep_tree(driver: &InMemoryDriver) {
        make_directory(driver, "/", "proj/sub").await.unwrap();
        write_text_file(driver, "/", "proj/readme.txt", "top")
            .await
            .unwrap();
        write_bytes_file(driver, "/", "proj/sub/raw.bin", &[0xFF, 0x00, 0x01])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_copy_preserves_structure_and_source() {
        let driver = InMemoryDriver::new();
        deep_tree(&driver).await;

        let (source, dest) = copy_path(&driver, "/", "proj", "proj2").await.unwrap();
        assert_eq!((source.as_str(), dest.as_str()), ("/proj", "/proj2"));

        for root in ["/proj", "/proj2"] {
            assert_eq!(
                read_text_file(&driver, root, "readme.txt").await.unwrap(),
                "top"
            );
            assert_eq!(
                read_bytes_file(&driver, root, "sub/raw.bin").await.unwrap(),
                [0xFF, 0x00, 0x01]
            );
        }
    }

    #[tokio::test]
    async fn test_remove_is_complete() {
        let driver = InMemoryDriver::new();
        deep_tree(&driver).await;

        remove_path(&driver, "/", "proj").await.unwrap();

        for gone in ["/proj", "/proj/readme.txt", "/proj/sub", "/proj/sub/raw.bin"] {
            assert!(!driver.exists(&FilePath::new(gone)).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_move_removes_source() {
        let driver = InMemoryDriver::new();
        deep_tree(&driver).await;

        move_path(&driver, "/", "proj", "moved").await.unwrap();

        assert!(!driver.exists(&FilePath::new("/proj")).await.unwrap());
        assert_eq!(
            read_text_file(&driver, "/moved", "readme.txt").await.unwrap(),
            "top"
        );
    }

    /// Delegates everything but fails every `rm`, to freeze a move between
    /// its copy and delete phases.
    struct RmFailDriver {
        inner: InMemoryDriver,
    }

    #[async_trait]
    impl Driver for RmFailDriver {
        async fn read_file(&self, p: &FilePath) -> Result<Vec<u8>> {
            self.inner.read_file(p).await
        }
        async fn write_file(&self, p: &FilePath, data: &[u8]) -> Result<()> {
            self.inner.write_file(p, data).await
        }
        async fn readdir(&self, p: &DirectoryPath) -> Result<Vec<FileEntry>> {
            self.inner.readdir(p).await
        }
        async fn stat(&self, p: &FilePath) -> Result<FileEntry> {
            self.inner.stat(p).await
        }
        async fn mkdir(&self, p: &DirectoryPath) -> Result<()> {
            self.inner.mkdir(p).await
        }
        async fn rm(&self, _p: &FilePath) -> Result<()> {
            Err(Error::Store("simulated storage failure".to_string()))
        }
        async fn exists(&self, p: &FilePath) -> Result<bool> {
            self.inner.exists(p).await
        }
        async fn backend_info(&self) -> BackendInfo {
            self.inner.backend_info().await
        }
    }

    #[tokio::test]
    async fn test_move_failure_leaves_duplicates_not_loss() {
        let driver = RmFailDriver {
            inner: InMemoryDriver::new(),
        };
        deep_tree(&driver.inner).await;

        // The copy phase succeeds; the delete phase fails. Both trees must
        // remain, with identical content — this pins the documented
        // non-atomic behavior.
        let err = move_path(&driver, "/", "proj", "moved").await.unwrap_err();
        assert_eq!(err.to_string(), "store error: simulated storage failure");

        for root in ["/proj", "/moved"] {
            assert_eq!(
                read_text_file(&driver, root, "readme.txt").await.unwrap(),
                "top"
            );
            assert_eq!(
                read_bytes_file(&driver, root, "sub/raw.bin").await.unwrap(),
                [0xFF, 0x00, 0x01]
            );
        }
    }

    #[tokio::test]
    async fn test_stat_path_returns_resolved_path() {
        let driver = sample_driver().await;
        let (resolved, entry) = stat_path(&driver, "/Docs", "../A.txt").await.unwrap();
        assert_eq!(resolved, "/A.txt");
        assert_eq!(entry.name, "A.txt");
        assert_eq!(entry.size, 5);
        assert!(!entry.is_directory);
    }

    #[tokio::test]
    async fn test_tree_text_rendering() {
        let driver = InMemoryDriver::new();
        make_directory(&driver, "/", "root/docs").await.unwrap();
        make_directory(&driver, "/", "root/src").await.unwrap();
        write_text_file(&driver, "/", "root/docs/guide.md", "g")
            .await
            .unwrap();
        write_text_file(&driver, "/", "root/src/main.rs", "m")
            .await
            .unwrap();
        write_text_file(&driver, "/", "root/readme.txt", "r")
            .await
            .unwrap();

        let rendered = tree_text(&driver, "/", "root").await.unwrap();
        let expected = "\
root/
├── docs/
│   └── guide.md
├── src/
│   └── main.rs
└── readme.txt";
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn test_build_tree_rejects_files() {
        let driver = sample_driver().await;
        let err = build_tree(&driver, "/", "A.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "Not a directory: A.txt");
    }

    #[test]
    fn prop_write_read_round_trip() {
        use proptest::prelude::*;

        proptest!(|(bytes in proptest::collection::vec(any::<u8>(), 0..512))| {
            let read = tokio_test::block_on(async {
                let driver = InMemoryDriver::new();
                write_bytes_file(&driver, "/", "blob.bin", &bytes)
                    .await
                    .unwrap();
                read_bytes_file(&driver, "/", "blob.bin").await.unwrap()
            });
            prop_assert_eq!(read, bytes);
        });
    }
}
