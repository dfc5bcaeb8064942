//! Built-in acceptance scenarios.
//!
//! Each scenario drives a [`Syscalls`] implementation from its current
//! working directory, which it treats as its base. Absolute paths are formed
//! under `base`, so several copies can run side by side in sibling
//! directories of one filesystem.

use memfs_kernel::{FAILURE, Syscalls};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::grader::{Grader, Report};

/// A named scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Scenario {
    /// Directory creation, navigation and removal.
    FilesysDir,
    /// Descriptor discipline around creat/open/unlink.
    FilesUnlink,
}

impl Scenario {
    /// Run against `sys`, whose cwd must be `base`.
    pub fn run(self, sys: &mut impl Syscalls, base: &str) -> Report {
        let name = format!("{self}@{base}");
        let mut grader = Grader::new(name);
        tracing::info!(scenario = %self, base = %base, "running scenario");
        match self {
            Scenario::FilesysDir => filesys_dir(sys, &mut grader, base),
            Scenario::FilesUnlink => files_unlink(sys, &mut grader),
        }
        grader.done()
    }
}

/// `rel` under `base`, as an absolute path.
fn under(base: &str, rel: &str) -> String {
    format!("{}/{rel}", base.trim_end_matches('/'))
}

/// Nested mkdir, `..` round trips, rmdir ordering and space neutrality.
pub fn filesys_dir(sys: &mut impl Syscalls, g: &mut Grader, base: &str) {
    let size = sys.get_free_disk_size();
    g.assert_true_msg(sys.mkdir("dir1") == 0, "error1");
    g.assert_true_msg(sys.mkdir("dir1/dir1_1") == 0, "error2");
    g.print_cwd(&*sys);

    sys.chdir("dir1/dir1_1");
    let nested = g.print_cwd(&*sys);
    g.assert_true_msg(nested == under(base, "dir1/dir1_1"), "chdir into dir1/dir1_1");

    sys.chdir("../../dir1/dir1_1/.././..");
    let back = g.print_cwd(&*sys);
    g.assert_true_msg(back == base, "round trip through .. did not return to base");

    sys.mkdir("dir2");
    sys.chdir("dir2");

    // No dir1 relative to dir2.
    g.assert_true_msg(sys.rmdir("dir1") == FAILURE, "error3");
    // Only dir1/dir1_1 exists.
    g.assert_true_msg(sys.rmdir(&under(base, "dir1/dir1")) == FAILURE, "error4");
    g.assert_true_msg(sys.rmdir(&under(base, "dir1")) == FAILURE, "dir1 removed while not empty");
    g.assert_true_msg(sys.rmdir(&under(base, "dir1/dir1_1")) == 0, "error5");
    g.assert_true_msg(sys.rmdir(&under(base, "dir1")) == 0, "error6");
    g.print_cwd(&*sys);

    sys.chdir(base);
    g.assert_true_msg(sys.rmdir(&under(base, "dir2")) == 0, "error7");
    g.assert_true_msg(sys.get_free_disk_size() == size, "error8");
}

pub const FILE_NOT_EXIST: &str = "file_not_exist";
pub const FILE_EXIST: &str = "cat.c";
pub const FILE_EXIST_CONTENT: &str = "#include \"syscall.h\"";
pub const NONSENSE: &str = "hello, world!";
pub const LOG_FILE: &str = "filetest.log";

/// Iterations of [`files_unlink`]. Each leaks one descriptor, so this must
/// stay below the descriptor limit minus the three the loop body needs.
pub const ITER_TIME: usize = 10;

/// Create [`FILE_EXIST`] with known leading content.
pub fn seed_fixture(sys: &mut impl Syscalls) -> bool {
    let fd = sys.creat(FILE_EXIST);
    if fd < 0 {
        return false;
    }
    let body = format!("{FILE_EXIST_CONTENT}\n\nint main() {{\n    return 0;\n}}\n");
    let written = sys.write(fd, body.as_bytes());
    sys.close(fd) == 0 && usize::try_from(written) == Ok(body.len())
}

fn log(sys: &mut impl Syscalls, fdl: i32, line: String) {
    tracing::trace!(%line, "files_unlink");
    if fdl >= 0 {
        sys.write(fdl, format!("{line}\n").as_bytes());
    }
}

fn read_string(sys: &mut impl Syscalls, fd: i32, len: usize) -> (i32, String) {
    let mut buf = vec![0u8; len];
    let ret = sys.read(fd, &mut buf);
    let n = usize::try_from(ret).unwrap_or(0).min(len);
    (ret, String::from_utf8_lossy(&buf[..n]).into_owned())
}

fn len_i32(s: &str) -> i32 {
    i32::try_from(s.len()).unwrap_or(i32::MAX)
}

/// Open/creat/close/unlink descriptor discipline, [`ITER_TIME`] rounds.
///
/// The existing-file descriptor opened each round is left open on purpose;
/// closing the session reclaims it.
pub fn files_unlink(sys: &mut impl Syscalls, g: &mut Grader) {
    g.assert_true_msg(seed_fixture(sys), "could not create fixture");
    let ec_length = len_i32(FILE_EXIST_CONTENT);
    let nonsense_length = len_i32(NONSENSE);
    let fdl = sys.creat(LOG_FILE);

    for _ in 0..ITER_TIME {
        let fd = sys.open(FILE_NOT_EXIST);
        log(sys, fdl, format!("try to open a non-existing file {FILE_NOT_EXIST}: {fd}"));
        g.assert_true(fd == FAILURE);

        let fdc = sys.open(FILE_EXIST);
        log(sys, fdl, format!("open an existing file {FILE_EXIST}: {fdc}"));
        g.assert_true(fdc > FAILURE);

        let (ret, leading) = read_string(sys, fdc, FILE_EXIST_CONTENT.len());
        g.assert_true(ret == ec_length);
        log(sys, fdl, format!("leading string is: {leading}"));
        g.assert_true(leading == FILE_EXIST_CONTENT);

        let mut fd = sys.creat("newfile");
        log(sys, fdl, format!("create newfile: {fd}"));
        g.assert_true(fd > FAILURE);
        g.assert_true(sys.write(fd, NONSENSE.as_bytes()) == nonsense_length);

        // A second descriptor on the same file.
        let mut fd2 = sys.open("newfile");
        log(sys, fdl, format!("open newfile: {fd2}"));

        let ret = sys.close(fd);
        g.assert_true(ret == 0);
        log(sys, fdl, format!("close {fd}: {ret}"));

        let closed = fd;
        fd = sys.open("newfile");
        log(sys, fdl, format!("open newfile: {fd}"));
        g.assert_true(fd > FAILURE);
        g.assert_true_msg(fd == closed, format!("handle {closed} was not recycled, got {fd}"));

        let ret = sys.close(fd2);
        g.assert_true(ret == 0);
        log(sys, fdl, format!("close {fd2}: {ret}"));

        fd2 = sys.open("newfile");
        log(sys, fdl, format!("open newfile: {fd2}"));

        // Two descriptors hold it, so the content survives the unlink.
        sys.unlink("newfile");
        log(sys, fdl, "trying to delete newfile".to_string());

        let ret = sys.open("newfile");
        g.assert_true(ret == FAILURE);
        log(sys, fdl, format!("attempt to open: {ret}"));

        let (ret, content) = read_string(sys, fd2, NONSENSE.len());
        g.assert_true(ret == nonsense_length);
        log(sys, fdl, format!("read from newfile through {fd2}: {content}"));
        g.assert_true(content == NONSENSE);

        let ret = sys.close(fd2);
        g.assert_true(ret == 0);
        log(sys, fdl, format!("close {fd2}: {ret}"));

        let ret = sys.creat("newfile");
        g.assert_true(ret == FAILURE);
        log(sys, fdl, format!("open newfile: {ret}"));

        let ret = sys.close(fd);
        g.assert_true(ret == 0);
        log(sys, fdl, format!("close the last fd {fd}: {ret}"));

        // Now the name is free again and the file starts empty.
        fd = sys.creat("newfile");
        g.assert_true(fd > FAILURE);
        log(sys, fdl, format!("open newfile: {fd}"));
        g.assert_true(read_string(sys, fd, NONSENSE.len()).0 == 0);
        g.assert_true(sys.write(fd, NONSENSE.as_bytes()) == nonsense_length);
        let ret = sys.close(fd);
        g.assert_true(ret == 0);
        log(sys, fdl, format!("close {fd}: {ret}"));

        // Recreating a closed file truncates it.
        fd = sys.creat("newfile");
        g.assert_true(fd > FAILURE);
        log(sys, fdl, format!("open newfile: {fd}"));
        g.assert_true(read_string(sys, fd, NONSENSE.len()).0 == 0);
        let ret = sys.close(fd);
        g.assert_true(ret == 0);
        log(sys, fdl, format!("close {fd}: {ret}"));
    }
}
