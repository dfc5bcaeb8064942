//! The shared filesystem: namespace, inode store and space accountant
//! behind one lock.
//!
//! [`FileSystem`] is a cheap clonable handle. Every operation takes the lock
//! exactly once, so each call is atomic with respect to other sessions.
//! Per-session state (working directory, descriptors) lives in
//! [`Session`](crate::Session) and never touches the lock.

use std::sync::Arc;

use memfs_types::{DirId, InodeId};
use parking_lot::{Mutex, MutexGuard};

use crate::config::FsConfig;
use crate::session::Session;
use crate::vfs::{
    DirChain, DirEntry, DirTree, EntryTarget, FileAttr, FsError, FsResult, FsStats, InodeState,
    InodeStore, PathResolver, Reclaimed, Resolved, SpaceAccountant,
};

/// Everything sessions share.
#[derive(Debug)]
struct FsState {
    tree: DirTree,
    inodes: InodeStore,
    space: SpaceAccountant,
    max_name_len: usize,
}

/// Handle to one filesystem instance.
///
/// Clones share the same state. There is no process-wide instance: create as
/// many independent filesystems as needed.
#[derive(Clone)]
pub struct FileSystem {
    config: Arc<FsConfig>,
    state: Arc<Mutex<FsState>>,
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("config", &self.config)
            .field("state", &"<locked>")
            .finish()
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

impl FileSystem {
    /// Create an empty filesystem: just the root directory, all space free.
    pub fn new(config: FsConfig) -> Self {
        let state = FsState {
            tree: DirTree::new(),
            inodes: InodeStore::new(),
            space: SpaceAccountant::new(config.capacity),
            max_name_len: config.max_name_len,
        };
        tracing::debug!(
            capacity = config.capacity,
            max_open_files = config.max_open_files,
            "created filesystem"
        );
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Open a new session with its cwd at root.
    pub fn session(&self) -> Session {
        Session::new(self)
    }

    fn lock(&self) -> MutexGuard<'_, FsState> {
        self.state.lock()
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Bytes available for file contents.
    pub fn free_space(&self) -> u64 {
        self.lock().space.free()
    }

    /// Live directories, root included.
    pub fn dir_count(&self) -> usize {
        self.lock().tree.live_count()
    }

    pub fn inode_state(&self, id: InodeId) -> InodeState {
        self.lock().inodes.state(id)
    }

    pub fn stats(&self) -> FsStats {
        let state = self.lock();
        FsStats {
            capacity: state.space.capacity(),
            free_space: state.space.free(),
            directories: state.tree.live_count(),
            inodes: state.inodes.len(),
            open_descriptors: state.inodes.open_descriptors(),
        }
    }

    // ========================================================================
    // Namespace
    // ========================================================================

    pub(crate) fn mkdir(&self, cwd: &DirChain, path: &str) -> FsResult<DirId> {
        self.lock().mkdir(cwd, path)
    }

    pub(crate) fn rmdir(&self, cwd: &DirChain, path: &str) -> FsResult<()> {
        self.lock().rmdir(cwd, path)
    }

    pub(crate) fn resolve_dir(&self, cwd: &DirChain, path: &str) -> FsResult<DirChain> {
        let state = self.lock();
        PathResolver::new(&state.tree, state.max_name_len).resolve_dir(cwd, path)
    }

    pub(crate) fn cwd_path(&self, cwd: &DirChain) -> Option<String> {
        self.lock().tree.absolute_path(cwd.current())
    }

    pub(crate) fn list_dir(&self, cwd: &DirChain, path: &str) -> FsResult<Vec<DirEntry>> {
        let state = self.lock();
        let chain = PathResolver::new(&state.tree, state.max_name_len).resolve_dir(cwd, path)?;
        state
            .tree
            .list(chain.current())
            .ok_or_else(|| FsError::not_found(path))
    }

    pub(crate) fn stat(&self, cwd: &DirChain, path: &str) -> FsResult<FileAttr> {
        let state = self.lock();
        let id = state.lookup_file(cwd, path)?;
        let inode = state
            .inodes
            .get(id)
            .ok_or_else(|| FsError::not_found(path))?;
        Ok(FileAttr {
            size: inode.size(),
            nlink: inode.link_count(),
            open_count: inode.open_count(),
        })
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Create or truncate `path` and register one open descriptor on it.
    pub(crate) fn creat(&self, cwd: &DirChain, path: &str) -> FsResult<InodeId> {
        self.lock().creat(cwd, path)
    }

    /// Register one open descriptor on the file at `path`.
    pub(crate) fn open(&self, cwd: &DirChain, path: &str) -> FsResult<InodeId> {
        let mut state = self.lock();
        let id = state.lookup_file(cwd, path)?;
        state.inodes.open(id)?;
        tracing::debug!(path = %path, inode = %id, "open");
        Ok(id)
    }

    pub(crate) fn read(&self, inode: InodeId, offset: u64, count: usize) -> FsResult<Vec<u8>> {
        self.lock().inodes.read_at(inode, offset, count)
    }

    pub(crate) fn write(&self, inode: InodeId, offset: u64, data: &[u8]) -> FsResult<usize> {
        let mut state = self.lock();
        let FsState { inodes, space, .. } = &mut *state;
        inodes.write_at(inode, offset, data, space)
    }

    /// Drop one open descriptor, reclaiming the inode if it was the last
    /// reference.
    pub(crate) fn close(&self, inode: InodeId) -> FsResult<()> {
        let mut state = self.lock();
        let reclaimed = {
            let FsState { inodes, space, .. } = &mut *state;
            inodes.close(inode, space)?
        };
        if let Some(reclaimed) = reclaimed {
            state.finish_reclaim(reclaimed);
        }
        Ok(())
    }

    pub(crate) fn unlink(&self, cwd: &DirChain, path: &str) -> FsResult<()> {
        self.lock().unlink(cwd, path)
    }
}

impl FsState {
    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.tree, self.max_name_len)
    }

    /// Inode of the file entry at `path`.
    fn lookup_file(&self, cwd: &DirChain, path: &str) -> FsResult<InodeId> {
        match self.resolver().resolve_parent(cwd, path)? {
            Resolved::Dir(_) => Err(FsError::not_a_file(path)),
            Resolved::Child { parent, name } => {
                match self.tree.lookup(parent.current(), &name).map(|e| e.target) {
                    Some(EntryTarget::File(id)) => Ok(id),
                    Some(EntryTarget::Dir(_)) => Err(FsError::not_a_file(path)),
                    None => Err(FsError::not_found(path)),
                }
            }
        }
    }

    fn mkdir(&mut self, cwd: &DirChain, path: &str) -> FsResult<DirId> {
        match self.resolver().resolve_parent(cwd, path)? {
            Resolved::Dir(_) => Err(FsError::already_exists(path)),
            Resolved::Child { parent, name } => {
                let id = self
                    .tree
                    .insert_dir(parent.current(), &name)
                    .map_err(|e| match e {
                        FsError::AlreadyExists(_) => FsError::already_exists(path),
                        other => other,
                    })?;
                tracing::debug!(path = %path, dir = %id, "mkdir");
                Ok(id)
            }
        }
    }

    fn rmdir(&mut self, cwd: &DirChain, path: &str) -> FsResult<()> {
        let chain = self.resolver().resolve_dir(cwd, path)?;
        self.tree.remove_dir(chain.current()).map_err(|e| match e {
            FsError::DirectoryNotEmpty(_) => FsError::directory_not_empty(path),
            other => other,
        })?;
        tracing::debug!(path = %path, dir = %chain.current(), "rmdir");
        Ok(())
    }

    fn creat(&mut self, cwd: &DirChain, path: &str) -> FsResult<InodeId> {
        let (dir, name) = match self.resolver().resolve_parent(cwd, path)? {
            Resolved::Dir(_) => return Err(FsError::not_a_file(path)),
            Resolved::Child { parent, name } => (parent.current(), name),
        };
        let node = self.tree.get(dir).ok_or_else(|| FsError::not_found(path))?;

        match node.get(&name).map(|e| e.target) {
            Some(EntryTarget::Dir(_)) => Err(FsError::not_a_file(path)),
            Some(EntryTarget::File(id)) => {
                let open_count = self.inodes.get(id).map_or(0, |i| i.open_count());
                if open_count > 0 {
                    return Err(FsError::file_busy(path));
                }
                self.inodes.truncate(id, &mut self.space)?;
                self.inodes.open(id)?;
                tracing::debug!(path = %path, inode = %id, "creat truncated existing file");
                Ok(id)
            }
            None => {
                if node.is_reserved(&name) {
                    return Err(FsError::file_busy(path));
                }
                let id = self.inodes.allocate();
                self.tree.insert_file(dir, &name, id)?;
                self.inodes.open(id)?;
                tracing::debug!(path = %path, inode = %id, "creat");
                Ok(id)
            }
        }
    }

    fn unlink(&mut self, cwd: &DirChain, path: &str) -> FsResult<()> {
        let (dir, name) = match self.resolver().resolve_parent(cwd, path)? {
            Resolved::Dir(_) => return Err(FsError::not_a_file(path)),
            Resolved::Child { parent, name } => (parent.current(), name),
        };
        let id = self.tree.remove_file(dir, &name).map_err(|e| match e {
            FsError::NotAFile(_) => FsError::not_a_file(path),
            _ => FsError::not_found(path),
        })?;

        match self.inodes.unlink(id, (dir, name.clone()), &mut self.space)? {
            Some(reclaimed) => self.finish_reclaim(reclaimed),
            None if self.inodes.state(id) == InodeState::UnlinkedOpen => {
                self.tree.reserve(dir, &name, id);
                tracing::debug!(path = %path, inode = %id, "unlink deferred, file still open");
            }
            None => {}
        }
        Ok(())
    }

    fn finish_reclaim(&mut self, reclaimed: Reclaimed) {
        match &reclaimed.reserved_in {
            Some((dir, name)) => {
                self.tree.release(*dir, name, reclaimed.id);
                tracing::info!(
                    inode = %reclaimed.id,
                    name = %name,
                    bytes = reclaimed.bytes,
                    free = self.space.free(),
                    "reclaimed unlinked inode on last close"
                );
            }
            None => tracing::debug!(
                inode = %reclaimed.id,
                bytes = reclaimed.bytes,
                free = self.space.free(),
                "reclaimed inode"
            ),
        }
    }
}
