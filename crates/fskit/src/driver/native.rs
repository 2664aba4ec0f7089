//! Native OS filesystem driver

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;

use super::traits::{Adapter, BackendInfo, Driver, FileEntry};
use crate::error::{Error, Result};
use crate::path::{self, DirectoryPath, FilePath};

/// Driver over the real OS filesystem via `tokio::fs`.
///
/// Paths are used as-is: on native hosts the resolver hands this driver
/// absolute OS paths, so no virtual mapping is involved. Raw I/O errors are
/// translated into the shared path-bearing error taxonomy so callers see
/// the same failures on every backend.
#[derive(Debug, Default)]
pub struct NativeDriver;

impl NativeDriver {
    pub fn new() -> Self {
        Self
    }

    async fn entry_for(node_path: &str) -> Result<FileEntry> {
        let meta = tokio::fs::metadata(node_path).await?;
        let mtime = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(FileEntry {
            name: path::basename(node_path),
            path: node_path.to_string(),
            is_directory: meta.is_dir(),
            size: meta.len(),
            mtime,
        })
    }
}

#[async_trait]
impl Driver for NativeDriver {
    async fn read_file(&self, file_path: &FilePath) -> Result<Vec<u8>> {
        match tokio::fs::metadata(file_path.as_str()).await {
            Ok(meta) if meta.is_dir() => return Err(Error::NotAFile(file_path.to_string())),
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::FileNotFound(file_path.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
        Ok(tokio::fs::read(file_path.as_str()).await?)
    }

    async fn write_file(&self, file_path: &FilePath, data: &[u8]) -> Result<()> {
        if let Ok(meta) = tokio::fs::metadata(file_path.as_str()).await {
            if meta.is_dir() {
                return Err(Error::NotAFile(file_path.to_string()));
            }
        }
        tokio::fs::write(file_path.as_str(), data)
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    Error::DirectoryNotFound(path::parent(file_path.as_str()))
                } else {
                    err.into()
                }
            })
    }

    async fn readdir(&self, dir_path: &DirectoryPath) -> Result<Vec<FileEntry>> {
        match tokio::fs::metadata(dir_path.as_str()).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(Error::NotADirectory(dir_path.to_string()));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::DirectoryNotFound(dir_path.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        let mut read_dir = tokio::fs::read_dir(dir_path.as_str()).await?;
        let mut entries = Vec::new();
        while let Some(dir_entry) = read_dir.next_entry().await? {
            let name = dir_entry.file_name().to_string_lossy().to_string();
            let full_path = path::join(dir_path.as_str(), &name);
            entries.push(Self::entry_for(&full_path).await?);
        }
        Ok(entries)
    }

    async fn stat(&self, file_path: &FilePath) -> Result<FileEntry> {
        Self::entry_for(file_path.as_str()).await.map_err(|err| {
            if let Error::Io(io_err) = &err {
                if io_err.kind() == ErrorKind::NotFound {
                    return Error::PathNotFound(file_path.to_string());
                }
            }
            err
        })
    }

    async fn mkdir(&self, dir_path: &DirectoryPath) -> Result<()> {
        Ok(tokio::fs::create_dir_all(dir_path.as_str()).await?)
    }

    async fn rm(&self, file_path: &FilePath) -> Result<()> {
        let meta = match tokio::fs::metadata(file_path.as_str()).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::PathNotFound(file_path.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if meta.is_dir() {
            Ok(tokio::fs::remove_dir(file_path.as_str()).await?)
        } else {
            Ok(tokio::fs::remove_file(file_path.as_str()).await?)
        }
    }

    async fn exists(&self, file_path: &FilePath) -> Result<bool> {
        Ok(tokio::fs::metadata(file_path.as_str()).await.is_ok())
    }

    async fn backend_info(&self) -> BackendInfo {
        BackendInfo::new(Adapter::Native)
    }
}
