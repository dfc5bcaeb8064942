//! Shared identifier types for memfs.
//!
//! A pure leaf crate: the kernel and the grader both build on it, and it has
//! no internal memfs dependencies.

pub mod ids;

pub use ids::{DirId, Fd, InodeId, SessionId};
