//! In-memory driver implementation

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::traits::{Adapter, BackendInfo, Driver, FileEntry};
use crate::error::{Error, Result};
use crate::path::{self, DirectoryPath, FilePath};

/// In-memory driver.
///
/// Stores all nodes in a path-keyed map. Used as the test double for the
/// tree operations and the snapshot codec, and as the backing store in
/// fake host bridges.
pub struct InMemoryDriver {
    nodes: RwLock<HashMap<String, MemoryNode>>,
}

#[derive(Debug, Clone)]
struct MemoryNode {
    data: Vec<u8>,
    is_directory: bool,
    mtime: DateTime<Utc>,
}

impl MemoryNode {
    fn directory() -> Self {
        Self {
            data: Vec::new(),
            is_directory: true,
            mtime: Utc::now(),
        }
    }

    fn file(data: Vec<u8>) -> Self {
        Self {
            data,
            is_directory: false,
            mtime: Utc::now(),
        }
    }
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDriver {
    /// Create an empty in-memory filesystem holding only the root.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), MemoryNode::directory());
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Create a filesystem pre-populated with text files.
    ///
    /// Ancestor directories of every seeded path are created as well.
    pub fn with_seed<'a>(seed: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let driver = Self::new();
        {
            let mut nodes = driver.nodes.write().unwrap();
            for (file_path, content) in seed {
                let file_path = path::normalize(file_path);
                ensure_ancestors(&mut nodes, &file_path);
                nodes.insert(file_path, MemoryNode::file(content.as_bytes().to_vec()));
            }
        }
        driver
    }

    fn entry_for(node_path: &str, node: &MemoryNode) -> FileEntry {
        FileEntry {
            name: path::basename(node_path),
            path: node_path.to_string(),
            is_directory: node.is_directory,
            size: node.data.len() as u64,
            mtime: node.mtime,
        }
    }
}

fn ensure_ancestors(nodes: &mut HashMap<String, MemoryNode>, target: &str) {
    let mut current = String::new();
    let segments = path::split_segments(target);
    for segment in &segments[..segments.len().saturating_sub(1)] {
        current.push('/');
        current.push_str(segment);
        nodes
            .entry(current.clone())
            .or_insert_with(MemoryNode::directory);
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    async fn read_file(&self, file_path: &FilePath) -> Result<Vec<u8>> {
        let nodes = self.nodes.read().unwrap();
        match nodes.get(file_path.as_str()) {
            Some(node) if node.is_directory => Err(Error::NotAFile(file_path.to_string())),
            Some(node) => Ok(node.data.clone()),
            None => Err(Error::FileNotFound(file_path.to_string())),
        }
    }

    async fn write_file(&self, file_path: &FilePath, data: &[u8]) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap();

        let parent = path::parent(file_path.as_str());
        match nodes.get(&parent) {
            Some(node) if node.is_directory => {}
            Some(_) => return Err(Error::NotADirectory(parent)),
            None => return Err(Error::DirectoryNotFound(parent)),
        }

        if let Some(existing) = nodes.get(file_path.as_str()) {
            if existing.is_directory {
                return Err(Error::NotAFile(file_path.to_string()));
            }
        }

        nodes.insert(file_path.to_string(), MemoryNode::file(data.to_vec()));
        Ok(())
    }

    async fn readdir(&self, dir_path: &DirectoryPath) -> Result<Vec<FileEntry>> {
        let nodes = self.nodes.read().unwrap();
        match nodes.get(dir_path.as_str()) {
            Some(node) if node.is_directory => {}
            _ => return Err(Error::DirectoryNotFound(dir_path.to_string())),
        }

        let prefix = if dir_path.as_str() == "/" {
            "/".to_string()
        } else {
            format!("{dir_path}/")
        };

        let entries = nodes
            .iter()
            .filter(|(node_path, _)| {
                node_path.as_str() != dir_path.as_str() && node_path.starts_with(&prefix)
            })
            .filter(|(node_path, _)| {
                let rel = &node_path[prefix.len()..];
                !rel.is_empty() && !rel.contains('/')
            })
            .map(|(node_path, node)| Self::entry_for(node_path, node))
            .collect();

        Ok(entries)
    }

    async fn stat(&self, file_path: &FilePath) -> Result<FileEntry> {
        let nodes = self.nodes.read().unwrap();
        nodes
            .get(file_path.as_str())
            .map(|node| Self::entry_for(file_path.as_str(), node))
            .ok_or_else(|| Error::PathNotFound(file_path.to_string()))
    }

    async fn mkdir(&self, dir_path: &DirectoryPath) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap();

        let mut current = String::new();
        for segment in path::split_segments(dir_path.as_str()) {
            current.push('/');
            current.push_str(segment);
            match nodes.get(&current) {
                Some(node) if node.is_directory => {}
                Some(_) => return Err(Error::NotADirectory(current)),
                None => {
                    nodes.insert(current.clone(), MemoryNode::directory());
                }
            }
        }
        Ok(())
    }

    async fn rm(&self, file_path: &FilePath) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap();
        nodes
            .remove(file_path.as_str())
            .map(|_| ())
            .ok_or_else(|| Error::PathNotFound(file_path.to_string()))
    }

    async fn exists(&self, file_path: &FilePath) -> Result<bool> {
        let nodes = self.nodes.read().unwrap();
        Ok(nodes.contains_key(file_path.as_str()))
    }

    async fn backend_info(&self) -> BackendInfo {
        BackendInfo::new(Adapter::Memory)
    }
}
