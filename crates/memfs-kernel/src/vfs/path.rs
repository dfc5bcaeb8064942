//! Path resolution against the directory tree.
//!
//! Paths are split on `/` with empty segments ignored. Absolute paths start
//! at the root, relative ones at the caller's working directory. Traversal
//! carries the whole chain of directories from root, so `..` pops the chain
//! (staying put at root) and keeps working even when the directory it started
//! from has since been removed.
//!
//! Resolution is a pure lookup: it never mutates the tree.

use memfs_types::DirId;

use super::error::{FsError, FsResult};
use super::tree::{DirTree, EntryTarget};

/// Chain of directory ids from root to some directory.
///
/// Invariant: never empty and always starts at [`DirId::ROOT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChain {
    ids: Vec<DirId>,
}

impl Default for DirChain {
    fn default() -> Self {
        Self::root()
    }
}

impl DirChain {
    pub fn root() -> Self {
        Self {
            ids: vec![DirId::ROOT],
        }
    }

    /// The directory this chain ends at.
    pub fn current(&self) -> DirId {
        self.ids.last().copied().unwrap_or(DirId::ROOT)
    }

    pub fn depth(&self) -> usize {
        self.ids.len() - 1
    }

    pub fn ids(&self) -> &[DirId] {
        &self.ids
    }

    fn push(&mut self, id: DirId) {
        self.ids.push(id);
    }

    /// Step to the parent; at root this stays at root.
    fn pop(&mut self) {
        if self.ids.len() > 1 {
            self.ids.pop();
        }
    }
}

/// One parsed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Current,
    Parent,
    Name(&'a str),
}

/// Split a path into segments, dropping the empty ones produced by repeated
/// or trailing separators.
pub fn segments(path: &str) -> impl Iterator<Item = Segment<'_>> {
    path.split('/').filter(|s| !s.is_empty()).map(|s| match s {
        "." => Segment::Current,
        ".." => Segment::Parent,
        name => Segment::Name(name),
    })
}

/// Outcome of resolving the parent of a path's final component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The path names a directory without a final name (`/`, `.`, `a/..`).
    Dir(DirChain),
    /// The final component is a name inside `parent`. The name may or may
    /// not exist yet.
    Child { parent: DirChain, name: String },
}

/// Resolves paths for one lookup under the filesystem lock.
pub struct PathResolver<'a> {
    tree: &'a DirTree,
    max_name_len: usize,
}

impl<'a> PathResolver<'a> {
    pub fn new(tree: &'a DirTree, max_name_len: usize) -> Self {
        Self { tree, max_name_len }
    }

    fn start(cwd: &DirChain, path: &str) -> FsResult<DirChain> {
        if path.is_empty() {
            return Err(FsError::invalid_path(path));
        }
        Ok(if path.starts_with('/') {
            DirChain::root()
        } else {
            cwd.clone()
        })
    }

    /// Apply one intermediate segment. Anything other than a live directory
    /// is `PathNotFound`.
    fn step(&self, chain: &mut DirChain, segment: Segment<'_>, path: &str) -> FsResult<()> {
        match segment {
            Segment::Current => {}
            Segment::Parent => chain.pop(),
            Segment::Name(name) => match self.tree.lookup(chain.current(), name) {
                Some(entry) => match entry.target {
                    EntryTarget::Dir(id) => chain.push(id),
                    EntryTarget::File(_) => return Err(FsError::not_found(path)),
                },
                None => return Err(FsError::not_found(path)),
            },
        }
        Ok(())
    }

    /// Resolve `path` to a directory. The final component must be a directory.
    pub fn resolve_dir(&self, cwd: &DirChain, path: &str) -> FsResult<DirChain> {
        let mut chain = Self::start(cwd, path)?;
        let mut segs = segments(path).peekable();
        while let Some(segment) = segs.next() {
            let is_final = segs.peek().is_none();
            if let (true, Segment::Name(name)) = (is_final, segment) {
                if let Some(entry) = self.tree.lookup(chain.current(), name) {
                    if let EntryTarget::File(_) = entry.target {
                        return Err(FsError::not_a_directory(path));
                    }
                }
            }
            self.step(&mut chain, segment, path)?;
        }
        if !self.tree.is_live(chain.current()) {
            return Err(FsError::not_found(path));
        }
        tracing::trace!(path = %path, dir = %chain.current(), "resolved directory");
        Ok(chain)
    }

    /// Resolve everything but the final component.
    ///
    /// The parent must exist; the final name is only validated, not looked up.
    pub fn resolve_parent(&self, cwd: &DirChain, path: &str) -> FsResult<Resolved> {
        let mut chain = Self::start(cwd, path)?;
        let segs: Vec<_> = segments(path).collect();
        let Some((last, init)) = segs.split_last() else {
            return Ok(Resolved::Dir(chain));
        };
        for segment in init {
            self.step(&mut chain, *segment, path)?;
        }
        if !self.tree.is_live(chain.current()) {
            return Err(FsError::not_found(path));
        }
        match *last {
            Segment::Name(name) => {
                if name.len() > self.max_name_len {
                    return Err(FsError::NameTooLong(name.to_string()));
                }
                Ok(Resolved::Child {
                    parent: chain,
                    name: name.to_string(),
                })
            }
            segment => {
                self.step(&mut chain, segment, path)?;
                if !self.tree.is_live(chain.current()) {
                    return Err(FsError::not_found(path));
                }
                Ok(Resolved::Dir(chain))
            }
        }
    }
}
