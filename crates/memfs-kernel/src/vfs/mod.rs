//! In-memory filesystem primitives.
//!
//! Key components, leaf first:
//!
//! - [`PathResolver`] - Turns path strings into directory chains
//! - [`DirTree`] - Generational arena of directories (the namespace)
//! - [`InodeStore`] - File contents with link/open reference counts
//! - [`DescriptorTable`] - Per-session handle table, lowest-free allocation
//! - [`SpaceAccountant`] - Free-space counter
//!
//! ## Design Decisions
//!
//! - **Ids, not pointers**: entries and descriptors hold `DirId`/`InodeId`;
//!   the arenas own the nodes.
//! - **Deferred reclamation**: an unlinked inode survives while any
//!   descriptor holds it, and its old name stays reserved until then.
//! - **No locking here**: these types are plain data. [`crate::FileSystem`]
//!   wraps them in one lock.

mod error;
pub mod fd;
pub mod inode;
pub mod path;
pub mod space;
pub mod tree;
mod types;

pub use error::{ErrorKind, FsError, FsResult};
pub use fd::{Descriptor, DescriptorTable};
pub use inode::{Inode, InodeStore, Reclaimed};
pub use path::{DirChain, PathResolver, Resolved};
pub use space::SpaceAccountant;
pub use tree::{DirTree, Directory, DirectoryEntry, EntryTarget};
pub use types::{DirEntry, FileAttr, FileType, FsStats, InodeState};
