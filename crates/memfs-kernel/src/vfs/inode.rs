//! Inode store: file contents with link and open reference counts.
//!
//! Directory entries and descriptors hold an [`InodeId`], never the inode
//! itself. An inode is freed exactly when both counts reach zero; that check
//! lives in [`InodeStore::reclaim_if_unreferenced`] and nowhere else.

use std::collections::HashMap;

use memfs_types::{DirId, InodeId};

use super::error::{FsError, FsResult};
use super::space::SpaceAccountant;
use super::types::InodeState;

/// A file content object.
#[derive(Debug, Clone, Default)]
pub struct Inode {
    data: Vec<u8>,
    link_count: u32,
    open_count: u32,
    /// Where the name lived before an unlink that happened while open.
    reserved_in: Option<(DirId, String)>,
}

impl Inode {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn link_count(&self) -> u32 {
        self.link_count
    }

    pub fn open_count(&self) -> u32 {
        self.open_count
    }

    fn state(&self) -> InodeState {
        if self.link_count > 0 {
            InodeState::LiveLinked
        } else {
            InodeState::UnlinkedOpen
        }
    }
}

/// An inode whose storage was just released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reclaimed {
    pub id: InodeId,
    pub bytes: u64,
    /// Reservation to drop from the former parent directory.
    pub reserved_in: Option<(DirId, String)>,
}

/// Arena of inodes keyed by stable id.
#[derive(Debug, Clone)]
pub struct InodeStore {
    inodes: HashMap<InodeId, Inode>,
    next_id: InodeId,
}

impl Default for InodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeStore {
    pub fn new() -> Self {
        Self {
            inodes: HashMap::new(),
            next_id: InodeId::new(1),
        }
    }

    /// Number of inodes not yet freed.
    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }

    pub fn get(&self, id: InodeId) -> Option<&Inode> {
        self.inodes.get(&id)
    }

    fn live_mut(&mut self, id: InodeId) -> FsResult<&mut Inode> {
        self.inodes
            .get_mut(&id)
            .ok_or_else(|| FsError::not_found(format!("{id}")))
    }

    pub fn state(&self, id: InodeId) -> InodeState {
        self.inodes
            .get(&id)
            .map(Inode::state)
            .unwrap_or(InodeState::Freed)
    }

    /// Sum of open counts across all inodes.
    pub fn open_descriptors(&self) -> usize {
        self.inodes.values().map(|i| i.open_count as usize).sum()
    }

    /// Allocate an empty inode with one link and no descriptors.
    ///
    /// Zero-length content costs no space.
    pub fn allocate(&mut self) -> InodeId {
        let id = self.next_id;
        self.next_id = id.next();
        self.inodes.insert(
            id,
            Inode {
                link_count: 1,
                ..Default::default()
            },
        );
        id
    }

    /// Register a new descriptor on `id`.
    pub fn open(&mut self, id: InodeId) -> FsResult<()> {
        let inode = self.live_mut(id)?;
        inode.open_count += 1;
        Ok(())
    }

    /// Copy up to `count` bytes starting at `offset`. Empty at or past EOF.
    pub fn read_at(&self, id: InodeId, offset: u64, count: usize) -> FsResult<Vec<u8>> {
        let inode = self
            .inodes
            .get(&id)
            .ok_or_else(|| FsError::not_found(format!("{id}")))?;
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(inode.data.len());
        let end = start.saturating_add(count).min(inode.data.len());
        Ok(inode.data[start..end].to_vec())
    }

    /// Write `data` at `offset`, growing the file as needed.
    ///
    /// Growth charges exactly the size delta; when that does not fit the
    /// write fails and nothing changes.
    pub fn write_at(
        &mut self,
        id: InodeId,
        offset: u64,
        data: &[u8],
        space: &mut SpaceAccountant,
    ) -> FsResult<usize> {
        let inode = self
            .inodes
            .get_mut(&id)
            .ok_or_else(|| FsError::not_found(format!("{id}")))?;

        let offset = usize::try_from(offset).map_err(|_| FsError::NoSpace {
            needed: offset,
            available: space.free(),
        })?;
        let end = offset.saturating_add(data.len());
        if end > inode.data.len() {
            space.charge((end - inode.data.len()) as u64)?;
            inode.data.resize(end, 0);
        }
        inode.data[offset..end].copy_from_slice(data);
        Ok(data.len())
    }

    /// Discard all content, crediting the space back.
    pub fn truncate(&mut self, id: InodeId, space: &mut SpaceAccountant) -> FsResult<()> {
        let inode = self.live_mut(id)?;
        let released = inode.size();
        inode.data = Vec::new();
        space.credit(released);
        Ok(())
    }

    /// Drop one name. If descriptors remain, `reserve` records the name the
    /// inode is still holding.
    pub fn unlink(
        &mut self,
        id: InodeId,
        reserve: (DirId, String),
        space: &mut SpaceAccountant,
    ) -> FsResult<Option<Reclaimed>> {
        let inode = self.live_mut(id)?;
        inode.link_count = inode.link_count.saturating_sub(1);
        if inode.link_count == 0 && inode.open_count > 0 {
            inode.reserved_in = Some(reserve);
        }
        Ok(self.reclaim_if_unreferenced(id, space))
    }

    /// Drop one descriptor.
    pub fn close(
        &mut self,
        id: InodeId,
        space: &mut SpaceAccountant,
    ) -> FsResult<Option<Reclaimed>> {
        let inode = self.live_mut(id)?;
        inode.open_count = inode.open_count.saturating_sub(1);
        Ok(self.reclaim_if_unreferenced(id, space))
    }

    /// Free `id` if nothing references it any more.
    fn reclaim_if_unreferenced(
        &mut self,
        id: InodeId,
        space: &mut SpaceAccountant,
    ) -> Option<Reclaimed> {
        let unreferenced = self
            .inodes
            .get(&id)
            .is_some_and(|i| i.link_count == 0 && i.open_count == 0);
        if !unreferenced {
            return None;
        }
        let inode = self.inodes.remove(&id)?;
        let bytes = inode.size();
        space.credit(bytes);
        Some(Reclaimed {
            id,
            bytes,
            reserved_in: inode.reserved_in,
        })
    }
}
