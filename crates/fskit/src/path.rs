//! Virtual path resolution
//!
//! All backends except the native one address a POSIX-style, `/`-rooted
//! virtual path space. The helpers here normalize user input into fully
//! resolved absolute paths with no `.`/`..` segments left, and the
//! [`FilePath`] / [`DirectoryPath`] newtypes carry that invariant through
//! the driver contract.

use std::fmt;

/// Normalize a path into absolute form.
///
/// Empty input and `.` collapse to the root. Relative input is rooted at
/// `/`. `.` segments are dropped and `..` segments pop their parent;
/// popping past the root is a no-op.
pub fn normalize(input: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in input.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Join two path fragments and normalize the result.
pub fn join(left: &str, right: &str) -> String {
    normalize(&format!("{left}/{right}"))
}

/// Resolve user input against a current working directory.
///
/// Absolute input is passed through normalization; relative input is
/// joined onto `cwd` first. The result is always a normalized absolute
/// path.
pub fn resolve(cwd: &str, input: &str) -> String {
    if input.starts_with('/') {
        normalize(input)
    } else {
        join(cwd, input)
    }
}

/// Last path segment, or `/` for the root.
pub fn basename(path: &str) -> String {
    split_segments(path)
        .last()
        .map_or_else(|| "/".to_string(), |name| (*name).to_string())
}

/// Parent directory of a path, or `/` when already at the root.
pub fn parent(path: &str) -> String {
    let segments = split_segments(path);
    if segments.len() <= 1 {
        "/".to_string()
    } else {
        format!("/{}", segments[..segments.len() - 1].join("/"))
    }
}

/// Non-empty path segments, in order.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Default working directory: the process cwd on native hosts, `/` in
/// virtual path spaces.
pub fn default_cwd() -> String {
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }
    #[cfg(target_arch = "wasm32")]
    {
        "/".to_string()
    }
}

/// Absolute path known to address a file.
///
/// Invariant: normalized, and never ends in a separator (except for the
/// root itself, which some operations probe with `stat`/`exists`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(String);

/// Absolute path known to address a directory.
///
/// Invariant: normalized, with no unresolved `.`/`..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryPath(String);

impl FilePath {
    /// Normalize `input` into a file path.
    pub fn new(input: impl AsRef<str>) -> Self {
        Self(normalize(input.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DirectoryPath {
    /// Normalize `input` into a directory path.
    pub fn new(input: impl AsRef<str>) -> Self {
        Self(normalize(input.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DirectoryPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<FilePath> for String {
    fn from(path: FilePath) -> Self {
        path.0
    }
}

impl From<DirectoryPath> for String {
    fn from(path: DirectoryPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_rooting() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("."), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("a/b"), "/a/b");
        assert_eq!(normalize("/a/b/"), "/a/b");
    }

    #[test]
    fn test_normalize_dot_segments() {
        assert_eq!(normalize("/a/./b"), "/a/b");
        assert_eq!(normalize("/a/b/.."), "/a");
        assert_eq!(normalize("/a/../../b"), "/b");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("//a///b"), "/a/b");
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("/home", "docs"), "/home/docs");
        assert_eq!(resolve("/home", "/etc"), "/etc");
        assert_eq!(resolve("/home/user", ".."), "/home");
        assert_eq!(resolve("/", "."), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/a", "b/c"), "/a/b/c");
        assert_eq!(join("/a/", "b"), "/a/b");
        assert_eq!(join("/", ".."), "/");
    }

    #[test]
    fn test_basename_and_parent() {
        assert_eq!(basename("/a/b/c.txt"), "c.txt");
        assert_eq!(basename("/"), "/");
        assert_eq!(parent("/a/b/c.txt"), "/a/b");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("/"), "/");
    }

    #[test]
    fn test_typed_paths_normalize() {
        assert_eq!(FilePath::new("a/b.txt").as_str(), "/a/b.txt");
        assert_eq!(DirectoryPath::new("/a/b/../c/").as_str(), "/a/c");
    }
}
