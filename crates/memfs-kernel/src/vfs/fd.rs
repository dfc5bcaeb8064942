//! Per-session open-descriptor table.
//!
//! Handles are slot indices. A new descriptor always takes the lowest free
//! slot, so a closed handle is the first one handed out again.

use memfs_types::{Fd, InodeId};

use super::error::{FsError, FsResult};

/// An open file: which inode and where the cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub inode: InodeId,
    pub offset: u64,
}

impl Descriptor {
    pub fn new(inode: InodeId) -> Self {
        Self { inode, offset: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct DescriptorTable {
    slots: Vec<Option<Descriptor>>,
    limit: usize,
}

impl DescriptorTable {
    /// Create an empty table holding at most `limit` descriptors.
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            limit,
        }
    }

    /// Number of open descriptors.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The handle the next [`insert`](Self::insert) would return.
    pub fn next_free(&self) -> FsResult<Fd> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());
        if index >= self.limit {
            return Err(FsError::TooManyOpenFiles(self.limit));
        }
        u32::try_from(index)
            .map(Fd::new)
            .map_err(|_| FsError::TooManyOpenFiles(self.limit))
    }

    /// Store a descriptor for `inode` at the lowest free handle.
    pub fn insert(&mut self, inode: InodeId) -> FsResult<Fd> {
        let fd = self.next_free()?;
        let index = fd.index();
        if index == self.slots.len() {
            self.slots.push(None);
        }
        self.slots[index] = Some(Descriptor::new(inode));
        Ok(fd)
    }

    pub fn get(&self, fd: Fd) -> FsResult<&Descriptor> {
        self.slots
            .get(fd.index())
            .and_then(Option::as_ref)
            .ok_or(FsError::BadDescriptor(fd.get().into()))
    }

    pub fn get_mut(&mut self, fd: Fd) -> FsResult<&mut Descriptor> {
        self.slots
            .get_mut(fd.index())
            .and_then(Option::as_mut)
            .ok_or(FsError::BadDescriptor(fd.get().into()))
    }

    /// Remove a descriptor. Its handle is free for reuse immediately.
    pub fn remove(&mut self, fd: Fd) -> FsResult<Descriptor> {
        let desc = self
            .slots
            .get_mut(fd.index())
            .and_then(Option::take)
            .ok_or(FsError::BadDescriptor(fd.get().into()))?;
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Ok(desc)
    }

    /// Open handles in ascending order.
    pub fn handles(&self) -> Vec<Fd> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .filter_map(|(i, _)| u32::try_from(i).ok().map(Fd::new))
            .collect()
    }

    /// Remove every descriptor, lowest handle first.
    pub fn drain(&mut self) -> Vec<(Fd, Descriptor)> {
        self.slots
            .drain(..)
            .enumerate()
            .filter_map(|(i, s)| Some((Fd::new(u32::try_from(i).ok()?), s?)))
            .collect()
    }
}
