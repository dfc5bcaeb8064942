//! Core VFS types.
//!
//! Plain data returned to callers. Serializable so the grader can dump
//! filesystem state alongside its report.

use serde::{Deserialize, Serialize};

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Directory entry as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// Lifecycle of an inode.
///
/// `LiveLinked` → (unlink) → `UnlinkedOpen` → (last close) → `Freed`.
/// An inode that is unlinked while closed goes straight to `Freed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InodeState {
    /// At least one name refers to the inode.
    LiveLinked,
    /// No names left, but descriptors still hold it.
    UnlinkedOpen,
    /// Storage released. Terminal.
    Freed,
}

/// Attributes of a file reachable by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// Number of names referring to the inode.
    pub nlink: u32,
    /// Number of live descriptors across all sessions.
    pub open_count: u32,
}

/// Filesystem statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsStats {
    /// Configured capacity in bytes.
    pub capacity: u64,
    /// Bytes not occupied by file contents.
    pub free_space: u64,
    /// Live directories, root included.
    pub directories: usize,
    /// Inodes not yet freed (linked or unlinked-but-open).
    pub inodes: usize,
    /// Sum of open counts over all inodes.
    pub open_descriptors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
    }

    #[test]
    fn test_dir_entry() {
        let file = DirEntry::file("test.txt");
        assert_eq!(file.name, "test.txt");
        assert!(file.kind.is_file());

        let dir = DirEntry::directory("subdir");
        assert!(dir.kind.is_dir());
    }

    #[test]
    fn test_stats_serialize() {
        let stats = FsStats {
            capacity: 1024,
            free_space: 1000,
            directories: 1,
            inodes: 2,
            open_descriptors: 1,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"free_space\":1000"));
    }
}
