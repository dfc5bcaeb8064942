//! Directory tree: a generational arena of directory nodes.
//!
//! Each node owns its name→entry mapping (insertion ordered) and keeps a
//! back-reference to its parent. Directories are not reference counted;
//! `rmdir` frees the node immediately and bumps the slot generation so
//! any outstanding [`DirId`] (a stale working directory) stops resolving.

use std::collections::HashMap;

use indexmap::IndexMap;
use memfs_types::{DirId, InodeId};

use super::error::{FsError, FsResult};
use super::types::{DirEntry, FileType};

/// What a directory entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTarget {
    Dir(DirId),
    File(InodeId),
}

/// A named entry inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub target: EntryTarget,
}

impl DirectoryEntry {
    pub fn kind(&self) -> FileType {
        match self.target {
            EntryTarget::Dir(_) => FileType::Directory,
            EntryTarget::File(_) => FileType::File,
        }
    }
}

/// A directory node.
#[derive(Debug, Clone)]
pub struct Directory {
    name: String,
    parent: Option<DirId>,
    entries: IndexMap<String, DirectoryEntry>,
    /// Names of unlinked files still held open. They block `creat` until the
    /// last descriptor closes but are not entries.
    reserved: HashMap<String, InodeId>,
}

impl Directory {
    fn new(name: impl Into<String>, parent: Option<DirId>) -> Self {
        Self {
            name: name.into(),
            parent,
            entries: IndexMap::new(),
            reserved: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.values()
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains_key(name)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Directory>,
}

/// The namespace.
#[derive(Debug, Clone)]
pub struct DirTree {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    live: usize,
}

impl Default for DirTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirTree {
    /// Create a tree holding only the root directory.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Directory::new("", None)),
            }],
            free_slots: Vec::new(),
            live: 1,
        }
    }

    /// Number of live directories, root included.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Look up a directory. `None` for ids whose directory has been removed.
    pub fn get(&self, id: DirId) -> Option<&Directory> {
        let slot = self.slots.get(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: DirId) -> Option<&mut Directory> {
        let slot = self.slots.get_mut(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    fn live_mut(&mut self, id: DirId) -> FsResult<&mut Directory> {
        self.get_mut(id)
            .ok_or_else(|| FsError::not_found(format!("{id}")))
    }

    pub fn is_live(&self, id: DirId) -> bool {
        self.get(id).is_some()
    }

    /// Entry `name` inside directory `dir`, if both exist.
    pub fn lookup(&self, dir: DirId, name: &str) -> Option<&DirectoryEntry> {
        self.get(dir)?.get(name)
    }

    /// Create an empty directory `name` under `parent`.
    pub fn insert_dir(&mut self, parent: DirId, name: &str) -> FsResult<DirId> {
        self.ensure_vacant(parent, name)?;

        let node = Directory::new(name, Some(parent));
        let id = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                DirId::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| FsError::invalid_path(name))?;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                DirId::new(index, 0)
            }
        };
        self.live += 1;

        self.live_mut(parent)?.entries.insert(
            name.to_string(),
            DirectoryEntry {
                name: name.to_string(),
                target: EntryTarget::Dir(id),
            },
        );
        Ok(id)
    }

    /// Insert a file entry for `inode` under `parent`.
    pub fn insert_file(&mut self, parent: DirId, name: &str, inode: InodeId) -> FsResult<()> {
        self.ensure_vacant(parent, name)?;
        self.live_mut(parent)?.entries.insert(
            name.to_string(),
            DirectoryEntry {
                name: name.to_string(),
                target: EntryTarget::File(inode),
            },
        );
        Ok(())
    }

    fn ensure_vacant(&self, parent: DirId, name: &str) -> FsResult<()> {
        let dir = self
            .get(parent)
            .ok_or_else(|| FsError::not_found(name))?;
        if dir.entries.contains_key(name) {
            return Err(FsError::already_exists(name));
        }
        Ok(())
    }

    /// Remove a file entry, returning the inode it pointed at.
    pub fn remove_file(&mut self, parent: DirId, name: &str) -> FsResult<InodeId> {
        let dir = self.live_mut(parent)?;
        match dir.entries.get(name).map(|e| e.target) {
            Some(EntryTarget::File(inode)) => {
                dir.entries.shift_remove(name);
                Ok(inode)
            }
            Some(EntryTarget::Dir(_)) => Err(FsError::not_a_file(name)),
            None => Err(FsError::not_found(name)),
        }
    }

    /// Remove an empty, non-root directory and free its node.
    pub fn remove_dir(&mut self, id: DirId) -> FsResult<()> {
        if id.is_root() {
            return Err(FsError::ProtectedRoot);
        }
        let dir = self
            .get(id)
            .ok_or_else(|| FsError::not_found(format!("{id}")))?;
        if !dir.is_empty() {
            return Err(FsError::directory_not_empty(dir.name.clone()));
        }
        let name = dir.name.clone();
        let parent = dir.parent.ok_or(FsError::ProtectedRoot)?;

        self.live_mut(parent)?.entries.shift_remove(&name);

        let slot = &mut self.slots[id.slot() as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.slot());
        self.live -= 1;
        Ok(())
    }

    /// Hold `name` in `dir` for an unlinked-but-open inode.
    pub fn reserve(&mut self, dir: DirId, name: &str, inode: InodeId) {
        if let Some(node) = self.get_mut(dir) {
            node.reserved.insert(name.to_string(), inode);
        }
    }

    /// Drop a reservation made by [`reserve`](Self::reserve).
    ///
    /// A no-op when the directory is gone or the name is held by another inode.
    pub fn release(&mut self, dir: DirId, name: &str, inode: InodeId) {
        if let Some(node) = self.get_mut(dir) {
            if node.reserved.get(name) == Some(&inode) {
                node.reserved.remove(name);
            }
        }
    }

    /// Absolute path of a live directory.
    pub fn absolute_path(&self, id: DirId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;
        loop {
            let dir = self.get(current)?;
            match dir.parent {
                Some(parent) => {
                    names.push(dir.name.as_str());
                    current = parent;
                }
                None => break,
            }
        }
        if names.is_empty() {
            return Some("/".to_string());
        }
        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    /// Entries of a live directory in insertion order.
    pub fn list(&self, id: DirId) -> Option<Vec<DirEntry>> {
        let dir = self.get(id)?;
        Some(
            dir.entries()
                .map(|e| DirEntry::new(e.name.clone(), e.kind()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_root() {
        let tree = DirTree::new();
        assert_eq!(tree.live_count(), 1);
        assert!(tree.is_live(DirId::ROOT));
        assert_eq!(tree.absolute_path(DirId::ROOT).as_deref(), Some("/"));
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut tree = DirTree::new();
        let a = tree.insert_dir(DirId::ROOT, "a").unwrap();
        let b = tree.insert_dir(a, "b").unwrap();
        tree.insert_file(a, "f", InodeId::new(1)).unwrap();

        assert_eq!(tree.live_count(), 3);
        assert_eq!(
            tree.lookup(DirId::ROOT, "a").map(|e| e.target),
            Some(EntryTarget::Dir(a))
        );
        assert_eq!(tree.get(b).and_then(|d| d.parent()), Some(a));
        assert_eq!(tree.absolute_path(b).as_deref(), Some("/a/b"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut tree = DirTree::new();
        tree.insert_dir(DirId::ROOT, "a").unwrap();
        let err = tree.insert_file(DirId::ROOT, "a", InodeId::new(1)).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[test]
    fn test_listing_keeps_insertion_order() {
        let mut tree = DirTree::new();
        tree.insert_dir(DirId::ROOT, "zeta").unwrap();
        tree.insert_file(DirId::ROOT, "alpha", InodeId::new(1)).unwrap();
        tree.insert_dir(DirId::ROOT, "mid").unwrap();

        let names: Vec<_> = tree
            .list(DirId::ROOT)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_remove_dir_rules() {
        let mut tree = DirTree::new();
        let a = tree.insert_dir(DirId::ROOT, "a").unwrap();
        let b = tree.insert_dir(a, "b").unwrap();

        assert_eq!(tree.remove_dir(DirId::ROOT), Err(FsError::ProtectedRoot));
        assert!(matches!(
            tree.remove_dir(a),
            Err(FsError::DirectoryNotEmpty(_))
        ));

        tree.remove_dir(b).unwrap();
        tree.remove_dir(a).unwrap();
        assert_eq!(tree.live_count(), 1);
        assert!(tree.lookup(DirId::ROOT, "a").is_none());
    }

    #[test]
    fn test_reused_slot_does_not_alias_stale_id() {
        let mut tree = DirTree::new();
        let old = tree.insert_dir(DirId::ROOT, "old").unwrap();
        tree.remove_dir(old).unwrap();

        let new = tree.insert_dir(DirId::ROOT, "new").unwrap();
        assert_eq!(old.slot(), new.slot());
        assert!(tree.get(old).is_none());
        assert_eq!(tree.get(new).map(|d| d.name()), Some("new"));
        assert!(tree.absolute_path(old).is_none());
    }

    #[test]
    fn test_reservations_do_not_block_rmdir() {
        let mut tree = DirTree::new();
        let a = tree.insert_dir(DirId::ROOT, "a").unwrap();
        tree.insert_file(a, "f", InodeId::new(9)).unwrap();
        let inode = tree.remove_file(a, "f").unwrap();
        tree.reserve(a, "f", inode);

        assert!(tree.get(a).unwrap().is_reserved("f"));
        tree.remove_dir(a).unwrap();
        // Releasing against the removed directory is harmless.
        tree.release(a, "f", inode);
    }

    #[test]
    fn test_remove_file_rejects_directories() {
        let mut tree = DirTree::new();
        tree.insert_dir(DirId::ROOT, "d").unwrap();
        assert!(matches!(
            tree.remove_file(DirId::ROOT, "d"),
            Err(FsError::NotAFile(_))
        ));
        assert!(matches!(
            tree.remove_file(DirId::ROOT, "missing"),
            Err(FsError::PathNotFound(_))
        ));
    }
}
