//! Sessions: one working directory and one descriptor table per caller.
//!
//! A session models a process. Several sessions may share one
//! [`FileSystem`] and run on different threads; each owns its cwd and
//! descriptors exclusively, so none of that needs a lock.
//!
//! Dropping a session closes every descriptor it still holds, which can
//! complete the reclamation of files unlinked while open.

use memfs_types::{Fd, SessionId};

use crate::fs::FileSystem;
use crate::vfs::{DescriptorTable, DirChain, DirEntry, FileAttr, FsError, FsResult};

pub struct Session {
    id: SessionId,
    fs: FileSystem,
    cwd: DirChain,
    fds: DescriptorTable,
    /// Error of the most recent failed syscall-surface call.
    last_error: Option<FsError>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("cwd", &self.cwd)
            .field("open", &self.fds.len())
            .finish()
    }
}

impl Session {
    /// Open a session on `fs` with its cwd at root and no descriptors.
    pub fn new(fs: &FileSystem) -> Self {
        let id = SessionId::new();
        tracing::debug!(session = %id.short(), "session opened");
        Self {
            id,
            fs: fs.clone(),
            cwd: DirChain::root(),
            fds: DescriptorTable::new(fs.config().max_open_files),
            last_error: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    /// Why the last [`Syscalls`](crate::Syscalls) call returned `-1`.
    pub fn last_error(&self) -> Option<&FsError> {
        self.last_error.as_ref()
    }

    pub(crate) fn set_last_error(&mut self, error: FsError) {
        self.last_error = Some(error);
    }

    // ========================================================================
    // Directories
    // ========================================================================

    pub fn mkdir(&self, path: &str) -> FsResult<()> {
        self.fs.mkdir(&self.cwd, path).map(|_| ())
    }

    /// Remove an empty directory. Removing another session's cwd (or this
    /// one's) is allowed; that cwd becomes stale.
    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        self.fs.rmdir(&self.cwd, path)
    }

    /// Change the working directory. On failure the cwd is unchanged.
    pub fn chdir(&mut self, path: &str) -> FsResult<()> {
        self.cwd = self.fs.resolve_dir(&self.cwd, path)?;
        tracing::trace!(session = %self.id.short(), path = %path, "chdir");
        Ok(())
    }

    /// Absolute path of the working directory, `None` once it was removed.
    pub fn cwd_path(&self) -> Option<String> {
        self.fs.cwd_path(&self.cwd)
    }

    pub fn list_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.fs.list_dir(&self.cwd, path)
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Create `path` (or truncate it if it exists and nobody holds it open)
    /// and open it.
    pub fn creat(&mut self, path: &str) -> FsResult<Fd> {
        self.fds.next_free()?;
        let inode = self.fs.creat(&self.cwd, path)?;
        self.fds.insert(inode)
    }

    /// Open an existing file at offset 0.
    pub fn open(&mut self, path: &str) -> FsResult<Fd> {
        self.fds.next_free()?;
        let inode = self.fs.open(&self.cwd, path)?;
        self.fds.insert(inode)
    }

    /// Read up to `count` bytes at the descriptor's offset. Empty at EOF.
    pub fn read(&mut self, fd: Fd, count: usize) -> FsResult<Vec<u8>> {
        let desc = *self.fds.get(fd)?;
        let bytes = self.fs.read(desc.inode, desc.offset, count)?;
        self.fds.get_mut(fd)?.offset += bytes.len() as u64;
        Ok(bytes)
    }

    /// Read into `buf`, returning the number of bytes copied.
    pub fn read_into(&mut self, fd: Fd, buf: &mut [u8]) -> FsResult<usize> {
        let bytes = self.read(fd, buf.len())?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Write `data` at the descriptor's offset, growing the file as needed.
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> FsResult<usize> {
        let desc = *self.fds.get(fd)?;
        let written = self.fs.write(desc.inode, desc.offset, data)?;
        self.fds.get_mut(fd)?.offset += written as u64;
        Ok(written)
    }

    /// Close a descriptor. The handle is reusable immediately.
    pub fn close(&mut self, fd: Fd) -> FsResult<()> {
        let desc = self.fds.remove(fd)?;
        self.fs.close(desc.inode)
    }

    /// Remove the name `path`. Open descriptors keep the content alive.
    pub fn unlink(&self, path: &str) -> FsResult<()> {
        self.fs.unlink(&self.cwd, path)
    }

    pub fn stat(&self, path: &str) -> FsResult<FileAttr> {
        self.fs.stat(&self.cwd, path)
    }

    /// The `getFreeDiskSize` value.
    pub fn free_disk_size(&self) -> u64 {
        self.fs.free_space()
    }

    /// Handles currently open in this session, ascending.
    pub fn open_handles(&self) -> Vec<Fd> {
        self.fds.handles()
    }

    /// Close every descriptor. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let drained = self.fds.drain();
        let count = drained.len();
        for (fd, desc) in drained {
            if let Err(e) = self.fs.close(desc.inode) {
                tracing::warn!(session = %self.id.short(), fd = %fd, error = %e, "close on exit failed");
            }
        }
        count
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let closed = self.close_all();
        tracing::debug!(session = %self.id.short(), closed, "session closed");
    }
}
