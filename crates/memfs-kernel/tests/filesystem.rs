//! Behavioral tests for a single session against a fresh filesystem.
//!
//! Each test drives the public `Session` API and checks the observable
//! results: handles, bytes, free space and error kinds.

use memfs_kernel::{ErrorKind, Fd, FileSystem, FsConfig, FsError, InodeState, Session};

// ============================================================================
// Shared test setup
// ============================================================================

const CAPACITY: u64 = 64 * 1024;

fn setup() -> (FileSystem, Session) {
    let fs = FileSystem::new(FsConfig::default().with_capacity(CAPACITY));
    let session = fs.session();
    (fs, session)
}

fn kind<T: std::fmt::Debug>(result: Result<T, FsError>) -> ErrorKind {
    result.expect_err("call should fail").kind()
}

fn write_file(s: &mut Session, path: &str, data: &[u8]) {
    let fd = s.creat(path).unwrap();
    s.write(fd, data).unwrap();
    s.close(fd).unwrap();
}

// ============================================================================
// Directories
// ============================================================================

#[test]
fn mkdir_rmdir_sequence_returns_to_baseline() {
    let (fs, s) = setup();
    let baseline = fs.dir_count();
    let free = s.free_disk_size();

    for name in ["a", "a/b", "a/b/c", "d"] {
        s.mkdir(name).unwrap();
    }
    assert_eq!(fs.dir_count(), baseline + 4);

    for name in ["a/b/c", "d", "a/b", "a"] {
        s.rmdir(name).unwrap();
    }
    assert_eq!(fs.dir_count(), baseline);
    assert_eq!(s.free_disk_size(), free);
}

#[test]
fn nested_chdir_and_rmdir_scenario() {
    let (_fs, mut s) = setup();
    s.mkdir("a").unwrap();
    s.mkdir("a/b").unwrap();
    s.chdir("a/b").unwrap();
    assert_eq!(s.cwd_path().as_deref(), Some("/a/b"));

    s.chdir("../../a/b/.././..").unwrap();
    assert_eq!(s.cwd_path().as_deref(), Some("/"));

    assert_eq!(kind(s.rmdir("a")), ErrorKind::DirectoryNotEmpty);
    assert_eq!(kind(s.rmdir("a/a")), ErrorKind::PathNotFound);
    s.rmdir("a/b").unwrap();
    s.rmdir("a").unwrap();
    assert_eq!(kind(s.chdir("a")), ErrorKind::PathNotFound);
}

#[test]
fn parent_of_root_is_root() {
    let (_fs, mut s) = setup();
    s.mkdir("x").unwrap();
    s.chdir("x").unwrap();
    s.chdir("/../../..").unwrap();
    assert_eq!(s.cwd_path().as_deref(), Some("/"));

    s.chdir("..").unwrap();
    assert_eq!(s.cwd_path().as_deref(), Some("/"));

    // Relative lookups from the "parent" of root still see root's entries.
    s.chdir("../x").unwrap();
    assert_eq!(s.cwd_path().as_deref(), Some("/x"));
}

#[test]
fn redundant_separators_are_ignored() {
    let (_fs, mut s) = setup();
    s.mkdir("a").unwrap();
    s.mkdir("a//b/").unwrap();
    s.chdir("//a///b//").unwrap();
    assert_eq!(s.cwd_path().as_deref(), Some("/a/b"));
}

#[test]
fn directory_errors() {
    let (_fs, mut s) = setup();
    s.mkdir("dir").unwrap();
    write_file(&mut s, "file", b"x");

    assert_eq!(kind(s.mkdir("dir")), ErrorKind::AlreadyExists);
    assert_eq!(kind(s.mkdir("file")), ErrorKind::AlreadyExists);
    assert_eq!(kind(s.mkdir("file/sub")), ErrorKind::PathNotFound);
    assert_eq!(kind(s.mkdir("nope/sub")), ErrorKind::PathNotFound);
    assert_eq!(kind(s.chdir("file")), ErrorKind::NotADirectory);
    assert_eq!(kind(s.rmdir("file")), ErrorKind::NotADirectory);
    assert_eq!(kind(s.rmdir("/")), ErrorKind::ProtectedRoot);
    assert_eq!(kind(s.mkdir("")), ErrorKind::InvalidPath);
    assert_eq!(kind(s.chdir("")), ErrorKind::InvalidPath);
}

#[test]
fn long_names_are_rejected() {
    let fs = FileSystem::new(FsConfig::default().with_max_name_len(8));
    let mut s = fs.session();
    s.mkdir("12345678").unwrap();
    assert_eq!(kind(s.mkdir("123456789")), ErrorKind::NameTooLong);
    assert_eq!(kind(s.creat("12345678/123456789")), ErrorKind::NameTooLong);
}

#[test]
fn rmdir_ignores_unlinked_open_files() {
    let (_fs, mut s) = setup();
    s.mkdir("d").unwrap();
    let fd = s.creat("d/f").unwrap();
    s.write(fd, b"still here").unwrap();
    s.unlink("d/f").unwrap();

    s.rmdir("d").unwrap();
    assert_eq!(s.write(fd, b"!").unwrap(), 1);
    assert_eq!(s.free_disk_size(), CAPACITY - 11);
    s.close(fd).unwrap();
    assert_eq!(s.free_disk_size(), CAPACITY);
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn balanced_file_lifecycle_restores_space() {
    let (fs, mut s) = setup();
    let before = s.free_disk_size();

    let fd = s.creat("data").unwrap();
    assert_eq!(s.write(fd, &[7u8; 1000]).unwrap(), 1000);
    assert_eq!(s.free_disk_size(), before - 1000);
    s.close(fd).unwrap();
    s.unlink("data").unwrap();

    assert_eq!(s.free_disk_size(), before);
    assert_eq!(fs.stats().inodes, 0);
}

#[test]
fn handles_are_lowest_free_first() {
    let (_fs, mut s) = setup();
    write_file(&mut s, "f", b"x");

    let handles: Vec<Fd> = (0..4).map(|_| s.open("f").unwrap()).collect();
    assert_eq!(handles.iter().map(|h| h.get()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);

    s.close(handles[1]).unwrap();
    s.close(handles[2]).unwrap();
    assert_eq!(s.open("f").unwrap(), handles[1]);
    assert_eq!(s.creat("g").unwrap(), handles[2]);
    assert_eq!(s.open("f").unwrap().get(), 4);
}

#[test]
fn independent_offsets_share_content() {
    let (_fs, mut s) = setup();
    let writer = s.creat("log").unwrap();
    let reader = s.open("log").unwrap();

    s.write(writer, b"first ").unwrap();
    assert_eq!(s.read(reader, 64).unwrap(), b"first ");
    s.write(writer, b"second").unwrap();
    assert_eq!(s.read(reader, 64).unwrap(), b"second");
    assert_eq!(s.read(reader, 64).unwrap(), b"");
}

#[test]
fn unlink_while_open() {
    let (fs, mut s) = setup();
    let fd = s.creat("victim").unwrap();
    s.write(fd, b"precious").unwrap();
    let reader = s.open("victim").unwrap();
    assert_eq!(s.free_disk_size(), CAPACITY - 8);
    assert_eq!(s.stat("victim").unwrap().open_count, 2);

    s.unlink("victim").unwrap();
    assert_eq!(kind(s.open("victim")), ErrorKind::PathNotFound);
    assert_eq!(kind(s.creat("victim")), ErrorKind::FileBusy);
    assert_eq!(kind(s.unlink("victim")), ErrorKind::PathNotFound);
    assert_eq!(s.free_disk_size(), CAPACITY - 8);

    let mut other = fs.session();
    assert_eq!(kind(other.open("/victim")), ErrorKind::PathNotFound);
    assert_eq!(fs.stats().inodes, 1);

    // Content stays reachable through the surviving descriptors.
    assert_eq!(s.read(reader, 100).unwrap(), b"precious");

    s.close(fd).unwrap();
    assert_eq!(kind(s.creat("victim")), ErrorKind::FileBusy);
    s.close(reader).unwrap();
    assert_eq!(s.free_disk_size(), CAPACITY);
    assert_eq!(fs.stats().inodes, 0);
    let fresh = s.creat("victim").unwrap();
    assert_eq!(s.read(fresh, 100).unwrap(), b"");
}

#[test]
fn unlinked_file_remains_readable_and_writable() {
    let (_fs, mut s) = setup();
    let writer = s.creat("f").unwrap();
    s.write(writer, b"abc").unwrap();
    let reader = s.open("f").unwrap();
    s.unlink("f").unwrap();

    s.write(writer, b"def").unwrap();
    assert_eq!(s.read(reader, 10).unwrap(), b"abcdef");
    assert_eq!(s.free_disk_size(), CAPACITY - 6);

    s.close(writer).unwrap();
    assert_eq!(s.free_disk_size(), CAPACITY - 6);
    assert_eq!(kind(s.creat("f")), ErrorKind::FileBusy);
    s.close(reader).unwrap();
    assert_eq!(s.free_disk_size(), CAPACITY);
}

#[test]
fn inode_state_machine() {
    let fs = FileSystem::default();
    let mut s = fs.session();
    let fd = s.creat("f").unwrap();
    let id = memfs_kernel::InodeId::new(1);

    assert_eq!(fs.inode_state(id), InodeState::LiveLinked);
    s.close(fd).unwrap();
    assert_eq!(fs.inode_state(id), InodeState::LiveLinked);

    let fd = s.open("f").unwrap();
    s.unlink("f").unwrap();
    assert_eq!(fs.inode_state(id), InodeState::UnlinkedOpen);
    s.close(fd).unwrap();
    assert_eq!(fs.inode_state(id), InodeState::Freed);
}

#[test]
fn creat_truncates_closed_file() {
    let (_fs, mut s) = setup();
    write_file(&mut s, "t", b"0123456789");
    assert_eq!(s.free_disk_size(), CAPACITY - 10);

    let fd = s.creat("t").unwrap();
    assert_eq!(s.read(fd, 10).unwrap(), b"");
    assert_eq!(s.free_disk_size(), CAPACITY);
    assert_eq!(s.stat("t").unwrap().size, 0);
}

#[test]
fn creat_on_open_file_is_busy() {
    let (_fs, mut s) = setup();
    let fd = s.creat("busy").unwrap();
    s.write(fd, b"keep").unwrap();
    assert_eq!(kind(s.creat("busy")), ErrorKind::FileBusy);
    assert_eq!(s.stat("busy").unwrap().size, 4);
    s.close(fd).unwrap();
    s.creat("busy").unwrap();
}

#[test]
fn file_errors() {
    let (_fs, mut s) = setup();
    s.mkdir("d").unwrap();
    assert_eq!(kind(s.creat("missing/f")), ErrorKind::PathNotFound);
    assert_eq!(kind(s.creat("d")), ErrorKind::NotAFile);
    assert_eq!(kind(s.open("d")), ErrorKind::NotAFile);
    assert_eq!(kind(s.open("nope")), ErrorKind::PathNotFound);
    assert_eq!(kind(s.unlink("d")), ErrorKind::NotAFile);
    assert_eq!(kind(s.unlink("nope")), ErrorKind::PathNotFound);
    assert_eq!(kind(s.read(Fd::new(0), 1)), ErrorKind::BadDescriptor);
}

#[test]
fn write_without_space_changes_nothing() {
    let fs = FileSystem::new(FsConfig::default().with_capacity(10));
    let mut s = fs.session();
    let fd = s.creat("f").unwrap();
    s.write(fd, b"12345678").unwrap();

    let err = s.write(fd, b"abc").unwrap_err();
    assert_eq!(
        err,
        FsError::NoSpace {
            needed: 3,
            available: 2
        }
    );
    assert_eq!(s.free_disk_size(), 2);
    assert_eq!(s.stat("f").unwrap().size, 8);

    // The offset did not move, so a smaller write still lands at 8.
    assert_eq!(s.write(fd, b"90").unwrap(), 2);
    assert_eq!(s.free_disk_size(), 0);
}

#[test]
fn descriptor_exhaustion_is_reported() {
    let fs = FileSystem::new(FsConfig::default().with_max_open_files(3));
    let mut s = fs.session();
    let fd = s.creat("f").unwrap();
    s.close(fd).unwrap();
    let open: Vec<Fd> = (0..3).map(|_| s.open("f").unwrap()).collect();
    assert_eq!(kind(s.open("f")), ErrorKind::TooManyOpenFiles);
    assert_eq!(kind(s.creat("g")), ErrorKind::TooManyOpenFiles);
    assert_eq!(kind(s.stat("g")), ErrorKind::PathNotFound);

    s.close(open[0]).unwrap();
    assert_eq!(s.creat("g").unwrap(), open[0]);
}
