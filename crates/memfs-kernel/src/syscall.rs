//! The syscall surface: integer returns with `-1` on failure.
//!
//! Programs written against a C-style filesystem interface (and the grader
//! scenarios) use [`Syscalls`]. The typed [`Session`] methods are the real
//! API; this layer only converts results and remembers the last error.

use memfs_types::Fd;

use crate::session::Session;
use crate::vfs::{FsError, FsResult};

/// Failure sentinel returned by every call.
pub const FAILURE: i32 = -1;

/// C-style filesystem calls.
///
/// Calls returning "success" give `0`; `creat`/`open` give a handle;
/// `read`/`write` give a byte count and move at most [`MAX_TRANSFER`] bytes
/// per call, like a short read or write.
pub trait Syscalls {
    fn mkdir(&mut self, path: &str) -> i32;
    fn rmdir(&mut self, path: &str) -> i32;
    fn chdir(&mut self, path: &str) -> i32;
    fn creat(&mut self, path: &str) -> i32;
    fn open(&mut self, path: &str) -> i32;
    fn read(&mut self, fd: i32, buf: &mut [u8]) -> i32;
    fn write(&mut self, fd: i32, buf: &[u8]) -> i32;
    fn close(&mut self, fd: i32) -> i32;
    fn unlink(&mut self, path: &str) -> i32;
    fn get_free_disk_size(&mut self) -> i64;

    /// Absolute cwd, for diagnostics. `None` when it was removed.
    fn cwd(&self) -> Option<String>;
}

impl Session {
    /// Convert a typed result into the integer convention, recording errors.
    fn sys_result<T>(
        &mut self,
        call: &'static str,
        result: FsResult<T>,
        ok: impl FnOnce(T) -> i32,
    ) -> i32 {
        match result {
            Ok(value) => ok(value),
            Err(e) => {
                tracing::debug!(
                    session = %self.id().short(),
                    call,
                    kind = %e.kind(),
                    error = %e,
                    "syscall failed"
                );
                self.set_last_error(e);
                FAILURE
            }
        }
    }

    fn sys_fd(&mut self, call: &'static str, raw: i32) -> Option<Fd> {
        let fd = Fd::from_raw(raw);
        if fd.is_none() {
            self.sys_result::<()>(call, Err(FsError::BadDescriptor(raw.into())), |_| 0);
        }
        fd
    }
}

/// Largest transfer a single `read`/`write` performs, so the byte count
/// always fits the return value.
pub const MAX_TRANSFER: usize = i32::MAX as usize;

fn transfer_len(len: usize) -> usize {
    len.min(MAX_TRANSFER)
}

fn count(n: usize) -> i32 {
    i32::try_from(transfer_len(n)).unwrap_or(i32::MAX)
}

impl Syscalls for Session {
    fn mkdir(&mut self, path: &str) -> i32 {
        let result = Session::mkdir(self, path);
        self.sys_result("mkdir", result, |_| 0)
    }

    fn rmdir(&mut self, path: &str) -> i32 {
        let result = Session::rmdir(self, path);
        self.sys_result("rmdir", result, |_| 0)
    }

    fn chdir(&mut self, path: &str) -> i32 {
        let result = Session::chdir(self, path);
        self.sys_result("chdir", result, |_| 0)
    }

    fn creat(&mut self, path: &str) -> i32 {
        let result = Session::creat(self, path);
        self.sys_result("creat", result, |fd| fd.as_raw())
    }

    fn open(&mut self, path: &str) -> i32 {
        let result = Session::open(self, path);
        self.sys_result("open", result, |fd| fd.as_raw())
    }

    fn read(&mut self, fd: i32, buf: &mut [u8]) -> i32 {
        let Some(fd) = self.sys_fd("read", fd) else {
            return FAILURE;
        };
        let len = transfer_len(buf.len());
        let result = self.read_into(fd, &mut buf[..len]);
        self.sys_result("read", result, count)
    }

    fn write(&mut self, fd: i32, buf: &[u8]) -> i32 {
        let Some(fd) = self.sys_fd("write", fd) else {
            return FAILURE;
        };
        let len = transfer_len(buf.len());
        let result = Session::write(self, fd, &buf[..len]);
        self.sys_result("write", result, count)
    }

    fn close(&mut self, fd: i32) -> i32 {
        let Some(fd) = self.sys_fd("close", fd) else {
            return FAILURE;
        };
        let result = Session::close(self, fd);
        self.sys_result("close", result, |_| 0)
    }

    fn unlink(&mut self, path: &str) -> i32 {
        let result = Session::unlink(self, path);
        self.sys_result("unlink", result, |_| 0)
    }

    fn get_free_disk_size(&mut self) -> i64 {
        i64::try_from(self.free_disk_size()).unwrap_or(i64::MAX)
    }

    fn cwd(&self) -> Option<String> {
        self.cwd_path()
    }
}
