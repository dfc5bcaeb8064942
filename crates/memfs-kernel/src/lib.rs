//! # memfs-kernel
//!
//! In-memory hierarchical filesystem with per-session descriptors.
//!
//! A [`FileSystem`] owns the namespace, the inode store and the space
//! counter. Callers work through [`Session`]s, each holding a working
//! directory and a descriptor table:
//! - Paths resolve against the session cwd (`.`, `..`, absolute or relative)
//! - Files unlinked while open stay readable until the last close
//! - Handles are the lowest free slot, reused as soon as they close
//! - Every byte of file content is charged against a fixed capacity
//!
//! [`Syscalls`] exposes the same operations with C-style integer returns.

pub mod config;
pub mod fs;
pub mod session;
pub mod syscall;
pub mod vfs;

pub use config::{ConfigError, FsConfig};
pub use fs::FileSystem;
pub use memfs_types::{DirId, Fd, InodeId, SessionId};
pub use session::Session;
pub use syscall::{FAILURE, MAX_TRANSFER, Syscalls};
pub use vfs::{DirEntry, ErrorKind, FileAttr, FileType, FsError, FsResult, FsStats, InodeState};
