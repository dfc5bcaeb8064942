//! Filesystem error types.

use std::io;

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Filesystem error type.
///
/// Every failing operation returns one of these and leaves the filesystem
/// exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// A path component does not exist or is not a directory.
    #[error("no such file or directory: {0}")]
    PathNotFound(String),

    /// An entry with that name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    NotAFile(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The file is held open (or pending deletion) and cannot be recreated.
    #[error("file busy: {0}")]
    FileBusy(String),

    /// The handle is not open in this session.
    #[error("bad file descriptor: {0}")]
    BadDescriptor(i64),

    /// The root directory cannot be removed.
    #[error("cannot remove root directory")]
    ProtectedRoot,

    /// Not enough free space for the requested growth.
    #[error("no space left: need {needed} bytes, {available} free")]
    NoSpace { needed: u64, available: u64 },

    /// The session's descriptor table is full.
    #[error("too many open files (limit {0})")]
    TooManyOpenFiles(usize),

    /// A path component is longer than the configured limit.
    #[error("file name too long: {0}")]
    NameTooLong(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Discriminant of [`FsError`], for matching and for script expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ErrorKind {
    PathNotFound,
    AlreadyExists,
    NotADirectory,
    NotAFile,
    DirectoryNotEmpty,
    FileBusy,
    BadDescriptor,
    ProtectedRoot,
    NoSpace,
    TooManyOpenFiles,
    NameTooLong,
    InvalidPath,
}

impl FsError {
    /// Create a PathNotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: impl Into<String>) -> Self {
        Self::NotAFile(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create a FileBusy error.
    pub fn file_busy(path: impl Into<String>) -> Self {
        Self::FileBusy(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::PathNotFound(_) => ErrorKind::PathNotFound,
            FsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FsError::NotADirectory(_) => ErrorKind::NotADirectory,
            FsError::NotAFile(_) => ErrorKind::NotAFile,
            FsError::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            FsError::FileBusy(_) => ErrorKind::FileBusy,
            FsError::BadDescriptor(_) => ErrorKind::BadDescriptor,
            FsError::ProtectedRoot => ErrorKind::ProtectedRoot,
            FsError::NoSpace { .. } => ErrorKind::NoSpace,
            FsError::TooManyOpenFiles(_) => ErrorKind::TooManyOpenFiles,
            FsError::NameTooLong(_) => ErrorKind::NameTooLong,
            FsError::InvalidPath(_) => ErrorKind::InvalidPath,
        }
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        let kind = match &e {
            FsError::PathNotFound(_) => io::ErrorKind::NotFound,
            FsError::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            FsError::NotADirectory(_) => io::ErrorKind::NotADirectory,
            FsError::NotAFile(_) => io::ErrorKind::IsADirectory,
            FsError::DirectoryNotEmpty(_) => io::ErrorKind::DirectoryNotEmpty,
            FsError::FileBusy(_) => io::ErrorKind::ResourceBusy,
            FsError::BadDescriptor(_) => io::ErrorKind::InvalidInput,
            FsError::ProtectedRoot => io::ErrorKind::PermissionDenied,
            FsError::NoSpace { .. } => io::ErrorKind::StorageFull,
            FsError::TooManyOpenFiles(_) => io::ErrorKind::Other,
            FsError::NameTooLong(_) => io::ErrorKind::InvalidFilename,
            FsError::InvalidPath(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, e)
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;
