//! BFT snapshot codec
//!
//! BFT is the JSON format for moving a whole directory subtree between
//! backends: a recursive node tree with text, binary, and directory
//! variants. Files whose bytes decode as strict UTF-8 (and contain no NUL)
//! are emitted as text; everything else is base64. Round-trips are
//! byte-exact either way.

use base64::Engine;
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::ops;
use crate::path::{self, DirectoryPath, FilePath};

/// Marker for the one supported binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BftEncoding {
    #[serde(rename = "base64")]
    Base64,
}

/// One node of a BFT snapshot.
///
/// Directory entry keys are single path segments; insertion order is
/// irrelevant and serialization is name-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BftNode {
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    Binary {
        encoding: BftEncoding,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    Directory {
        entries: BTreeMap<String, BftNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
}

/// Whether bytes qualify as a text node: strict UTF-8 with no NUL.
pub fn is_utf8_text(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(text) => !text.contains('\0'),
        Err(_) => false,
    }
}

/// Encode file bytes as the narrowest leaf node.
pub fn node_from_bytes(bytes: &[u8]) -> BftNode {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.contains('\0') => BftNode::Text {
            content: text.to_string(),
            comment: None,
        },
        _ => BftNode::Binary {
            encoding: BftEncoding::Base64,
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            comment: None,
        },
    }
}

/// Decode a leaf node back to file bytes.
///
/// Directory nodes have no byte content and are rejected.
pub fn node_to_bytes(node: &BftNode) -> Result<Vec<u8>> {
    match node {
        BftNode::Text { content, .. } => Ok(content.as_bytes().to_vec()),
        BftNode::Binary { content, .. } => {
            Ok(base64::engine::general_purpose::STANDARD.decode(content)?)
        }
        BftNode::Directory { .. } => Err(Error::Snapshot(
            "directory node has no byte content".to_string(),
        )),
    }
}

/// Parse snapshot JSON, requiring a directory at the root.
pub fn parse_json(text: &str) -> Result<BftNode> {
    let node: BftNode = serde_json::from_str(text)?;
    if !matches!(node, BftNode::Directory { .. }) {
        return Err(Error::Snapshot(
            "BFT root node must be a directory".to_string(),
        ));
    }
    Ok(node)
}

/// Serialize a snapshot as 2-space-indented JSON.
pub fn to_json(node: &BftNode) -> Result<String> {
    Ok(serde_json::to_string_pretty(node)?)
}

/// Export the directory at `requested` (resolved against `cwd`) as a
/// snapshot tree.
pub async fn export_tree(driver: &dyn Driver, cwd: &str, requested: &str) -> Result<BftNode> {
    let root_path = path::resolve(cwd, requested);
    let root = driver.stat(&FilePath::new(&root_path)).await?;
    if !root.is_directory {
        return Err(Error::NotADirectory(requested.to_string()));
    }
    export_directory(driver, root_path).await
}

fn export_directory<'a>(driver: &'a dyn Driver, dir_path: String) -> BoxFuture<'a, Result<BftNode>> {
    async move {
        let mut listed = driver.readdir(&DirectoryPath::new(&dir_path)).await?;
        ops::sort_entries(&mut listed);

        let mut entries = BTreeMap::new();
        for child in listed {
            let child_path = path::join(&dir_path, &child.name);
            let node = if child.is_directory {
                export_directory(driver, child_path).await?
            } else {
                let bytes = driver.read_file(&FilePath::new(&child_path)).await?;
                node_from_bytes(&bytes)
            };
            entries.insert(child.name, node);
        }

        Ok(BftNode::Directory {
            entries,
            comment: None,
        })
    }
    .boxed()
}

/// Import a snapshot under `dest` (resolved against `cwd`), returning the
/// resolved destination path.
///
/// The root must be a directory node; entries are written in name order.
pub async fn import_tree(
    driver: &dyn Driver,
    cwd: &str,
    dest: &str,
    node: &BftNode,
) -> Result<String> {
    if !matches!(node, BftNode::Directory { .. }) {
        return Err(Error::Snapshot(
            "BFT root node must be a directory".to_string(),
        ));
    }
    let dest_path = path::resolve(cwd, dest);
    import_node(driver, dest_path.clone(), node).await?;
    Ok(dest_path)
}

fn import_node<'a>(
    driver: &'a dyn Driver,
    target: String,
    node: &'a BftNode,
) -> BoxFuture<'a, Result<()>> {
    async move {
        match node {
            BftNode::Directory { entries, .. } => {
                driver.mkdir(&DirectoryPath::new(&target)).await?;
                for (name, child) in entries {
                    // Entry keys are single path segments.
                    if name.is_empty() || name.contains('/') {
                        return Err(Error::Snapshot(format!(
                            "invalid directory entry name: {name:?}"
                        )));
                    }
                    import_node(driver, path::join(&target, name), child).await?;
                }
                Ok(())
            }
            leaf => {
                let bytes = node_to_bytes(leaf)?;
                driver.write_file(&FilePath::new(&target), &bytes).await
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::InMemoryDriver;
    use pretty_assertions::assert_eq;

    fn entries_of(node: &BftNode) -> &BTreeMap<String, BftNode> {
        match node {
            BftNode::Directory { entries, .. } => entries,
            _ => panic!("expected a directory node"),
        }
    }

    #[test]
    fn test_text_binary_classification() {
        assert!(is_utf8_text(b"Hello, World!"));
        assert!(is_utf8_text("héllo".as_bytes()));
        // NUL forces binary even though it is valid UTF-8.
        assert!(!is_utf8_text(b"hel\0lo"));
        assert!(!is_utf8_text(&[0xFF, 0xD8, 0x00]));

        assert!(matches!(node_from_bytes(b"plain"), BftNode::Text { .. }));
        assert!(matches!(
            node_from_bytes(&[0xFF, 0xD8, 0x00]),
            BftNode::Binary { .. }
        ));
    }

    #[test]
    fn test_json_shape_is_stable() {
        let node = BftNode::Directory {
            entries: BTreeMap::from([
                (
                    "hello.txt".to_string(),
                    node_from_bytes(b"Hello, World!"),
                ),
                ("logo.bin".to_string(), node_from_bytes(&[0xFF, 0xD8, 0x00])),
            ]),
            comment: Some("sample".to_string()),
        };

        let json = to_json(&node).unwrap();
        assert!(json.contains(r#""type": "directory""#));
        assert!(json.contains(r#""type": "text""#));
        assert!(json.contains(r#""type": "binary""#));
        assert!(json.contains(r#""encoding": "base64""#));
        assert!(json.contains(r#""content": "/9gA""#));

        let parsed = parse_json(&json).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_parse_rejects_non_directory_root() {
        let err = parse_json(r#"{"type":"text","content":"x"}"#).unwrap_err();
        assert_eq!(err.to_string(), "snapshot error: BFT root node must be a directory");
    }

    #[test]
    fn test_comment_fields_survive_round_trip() {
        let json = r#"{
  "type": "directory",
  "entries": {
    "a.txt": { "type": "text", "content": "a", "comment": "kept" }
  }
}"#;
        let node = parse_json(json).unwrap();
        let reserialized = to_json(&node).unwrap();
        assert!(reserialized.contains(r#""comment": "kept""#));
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let driver = InMemoryDriver::new();
        ops::make_directory(&driver, "/", "export/sub").await.unwrap();
        ops::write_text_file(&driver, "/export", "hello.txt", "Hello, World!")
            .await
            .unwrap();
        ops::write_bytes_file(&driver, "/export", "logo.bin", &[0xFF, 0xD8, 0x00])
            .await
            .unwrap();
        ops::write_text_file(&driver, "/export/sub", "nested.txt", "nested")
            .await
            .unwrap();

        let snapshot = export_tree(&driver, "/", "export").await.unwrap();

        let entries = entries_of(&snapshot);
        assert_eq!(
            entries.keys().map(String::as_str).collect::<Vec<_>>(),
            ["hello.txt", "logo.bin", "sub"]
        );
        assert!(matches!(entries["hello.txt"], BftNode::Text { .. }));
        assert!(matches!(entries["logo.bin"], BftNode::Binary { .. }));

        // Decode into a fresh backend, through JSON to cover the codec.
        let json = to_json(&snapshot).unwrap();
        let decoded = parse_json(&json).unwrap();

        let fresh = InMemoryDriver::new();
        let dest = import_tree(&fresh, "/", "import", &decoded).await.unwrap();
        assert_eq!(dest, "/import");

        assert_eq!(
            ops::read_text_file(&fresh, "/import", "hello.txt")
                .await
                .unwrap(),
            "Hello, World!"
        );
        assert_eq!(
            ops::read_bytes_file(&fresh, "/import", "logo.bin")
                .await
                .unwrap(),
            [0xFF, 0xD8, 0x00]
        );
        assert_eq!(
            ops::read_text_file(&fresh, "/import/sub", "nested.txt")
                .await
                .unwrap(),
            "nested"
        );
    }

    #[tokio::test]
    async fn test_export_rejects_files() {
        let driver = InMemoryDriver::new();
        ops::write_text_file(&driver, "/", "lone.txt", "x")
            .await
            .unwrap();
        let err = export_tree(&driver, "/", "lone.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "Not a directory: lone.txt");
    }

    #[tokio::test]
    async fn test_import_rejects_leaf_root() {
        let driver = InMemoryDriver::new();
        let err = import_tree(&driver, "/", "dest", &node_from_bytes(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "snapshot error: BFT root node must be a directory");
    }

    #[tokio::test]
    async fn test_import_rejects_entry_names_with_separators() {
        let driver = InMemoryDriver::new();
        let node = BftNode::Directory {
            entries: BTreeMap::from([("evil/name".to_string(), node_from_bytes(b"x"))]),
            comment: None,
        };
        let err = import_tree(&driver, "/", "dest", &node).await.unwrap_err();
        assert!(err.to_string().contains("invalid directory entry name"));
    }

    #[test]
    fn prop_leaf_round_trip_is_byte_exact() {
        use proptest::prelude::*;

        proptest!(|(bytes in proptest::collection::vec(any::<u8>(), 0..256))| {
            let node = node_from_bytes(&bytes);
            let decoded = node_to_bytes(&node).unwrap();
            prop_assert_eq!(decoded, bytes);
        });
    }
}
