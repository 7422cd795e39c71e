use std::sync::Arc;

use vfs::{Dirent, FsError, OpenFlags, SeekWhence};

mod common;
use common::{IOCTL_MAGIC, mode, setup};

fn rw() -> OpenFlags {
    OpenFlags::O_RDWR
}

#[test]
fn test_open_create_and_excl() {
    let (vfs, _) = setup();
    assert_eq!(
        vfs.open("/new", rw(), mode(0o644)).unwrap_err(),
        FsError::NotFound
    );

    let file = vfs
        .open("/new", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    assert!(file.readable() && file.writable());
    assert_eq!(file.position(), 0);
    vfs.close(&file).unwrap();

    assert_eq!(
        vfs.open("/new", rw() | OpenFlags::O_CREAT | OpenFlags::O_EXCL, mode(0o644))
            .unwrap_err(),
        FsError::AlreadyExists
    );
    let again = vfs.open("/new", rw() | OpenFlags::O_CREAT, mode(0o644)).unwrap();
    vfs.close(&again).unwrap();
}

#[test]
fn test_open_rejects_bad_modes() {
    let (vfs, _) = setup();
    vfs.mkdir("/d", mode(0o755)).unwrap();
    vfs.create("/f", mode(0o644)).unwrap();

    assert_eq!(
        vfs.open("/d", OpenFlags::O_WRONLY, mode(0)).unwrap_err(),
        FsError::IsDirectory
    );
    assert_eq!(
        vfs.open("/f", OpenFlags::O_ACCMODE, mode(0)).unwrap_err(),
        FsError::InvalidArgument
    );
    assert_eq!(
        vfs.open("/f", OpenFlags::O_RDONLY | OpenFlags::O_DIRECTORY, mode(0))
            .unwrap_err(),
        FsError::NotDirectory
    );
    // 失败的 open 不留下引用
    assert_eq!(vfs.resolve("/f").unwrap().inode().ref_count(), 1);
}

#[test]
fn test_read_write_seek() {
    let (vfs, memfs) = setup();
    let file = vfs
        .open("/data", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    assert_eq!(vfs.write(&file, b"hello world").unwrap(), 11);
    assert_eq!(file.position(), 11);

    let inode = vfs.resolve("/data").unwrap().inode().clone();
    assert_eq!(inode.size(), 11);
    assert_eq!(memfs.last().contents(inode.id().index), b"hello world");

    assert_eq!(vfs.seek(&file, 6, SeekWhence::Set).unwrap(), 6);
    let mut buf = [0u8; 32];
    let n = vfs.read(&file, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"world");
    assert_eq!(vfs.read(&file, &mut buf).unwrap(), 0);

    assert_eq!(vfs.seek(&file, -5, SeekWhence::End).unwrap(), 6);
    assert_eq!(vfs.seek(&file, 2, SeekWhence::Cur).unwrap(), 8);
    assert_eq!(
        vfs.seek(&file, 1, SeekWhence::End).unwrap_err(),
        FsError::InvalidArgument
    );
    assert_eq!(
        vfs.seek(&file, -1, SeekWhence::Set).unwrap_err(),
        FsError::InvalidArgument
    );
    assert_eq!(file.position(), 8);
    vfs.close(&file).unwrap();
}

#[test]
fn test_capabilities_enforced() {
    let (vfs, _) = setup();
    vfs.create("/f", mode(0o644)).unwrap();
    let ro = vfs.open("/f", OpenFlags::O_RDONLY, mode(0)).unwrap();
    let wo = vfs.open("/f", OpenFlags::O_WRONLY, mode(0)).unwrap();

    assert_eq!(vfs.write(&ro, b"x").unwrap_err(), FsError::BadFileDescriptor);
    let mut buf = [0u8; 4];
    assert_eq!(
        vfs.read(&wo, &mut buf).unwrap_err(),
        FsError::BadFileDescriptor
    );
    assert_eq!(vfs.truncate(&ro, 0).unwrap_err(), FsError::InvalidArgument);

    vfs.close(&ro).unwrap();
    vfs.close(&wo).unwrap();
    assert_eq!(vfs.read(&ro, &mut buf).unwrap_err(), FsError::BadFileDescriptor);
    assert_eq!(vfs.close(&ro).unwrap_err(), FsError::BadFileDescriptor);
}

#[test]
fn test_append_mode() {
    let (vfs, _) = setup();
    let f = vfs
        .open("/log", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    vfs.write(&f, b"abc").unwrap();

    let app = vfs
        .open("/log", OpenFlags::O_WRONLY | OpenFlags::O_APPEND, mode(0))
        .unwrap();
    assert_eq!(app.position(), 3);
    vfs.write(&f, b"XYZW").unwrap();
    vfs.write(&app, b"!").unwrap();
    assert_eq!(app.position(), 8);

    vfs.seek(&f, 0, SeekWhence::Set).unwrap();
    let mut buf = [0u8; 16];
    let n = vfs.read(&f, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"abcXYZW!");
    vfs.close(&f).unwrap();
    vfs.close(&app).unwrap();
}

#[test]
fn test_n_opens_free_once_at_last_close() {
    let (vfs, _) = setup();
    vfs.create("/victim", mode(0o644)).unwrap();
    let inode = vfs.resolve("/victim").unwrap().inode().clone();
    let id = inode.id();

    let files: Vec<_> = (0..3)
        .map(|_| vfs.open("/victim", OpenFlags::O_RDONLY, mode(0)).unwrap())
        .collect();
    assert_eq!(inode.ref_count(), 4);

    vfs.unlink("/victim").unwrap();
    assert_eq!(vfs.resolve("/victim").unwrap_err(), FsError::NotFound);
    assert_eq!(inode.ref_count(), 3);

    for (i, file) in files.iter().enumerate() {
        assert!(!inode.is_freed(), "freed early at close {i}");
        assert!(vfs.inode_store().contains(id));
        vfs.close(file).unwrap();
    }
    assert!(inode.is_freed());
    assert_eq!(inode.ref_count(), 0);
    assert!(!vfs.inode_store().contains(id));
}

#[test]
fn test_dup_and_clone() {
    let (vfs, _) = setup();
    let f = vfs
        .open("/f", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    vfs.write(&f, b"0123456789").unwrap();
    let inode = vfs.resolve("/f").unwrap().inode().clone();
    assert_eq!(inode.ref_count(), 2);

    let d = vfs.dup(&f).unwrap();
    assert!(Arc::ptr_eq(&d, &f));
    assert_eq!(f.ref_count(), 2);
    assert_eq!(inode.ref_count(), 2);

    vfs.seek(&f, 4, SeekWhence::Set).unwrap();
    let c = vfs.clone_file(&f).unwrap();
    assert!(!Arc::ptr_eq(&c, &f));
    assert_eq!(c.position(), 4);
    assert_eq!(c.flags(), f.flags());
    assert_eq!(inode.ref_count(), 3);

    // 克隆出来的句柄有独立的位置
    let mut buf = [0u8; 2];
    vfs.read(&c, &mut buf).unwrap();
    assert_eq!(&buf, b"45");
    assert_eq!(f.position(), 4);

    vfs.close(&d).unwrap();
    assert_eq!(inode.ref_count(), 3);
    vfs.close(&f).unwrap();
    assert_eq!(inode.ref_count(), 2);
    vfs.close(&c).unwrap();
    assert_eq!(inode.ref_count(), 1);
    assert!(!inode.is_freed());
    assert_eq!(vfs.dup(&f).unwrap_err(), FsError::BadFileDescriptor);
}

#[test]
fn test_truncate_by_rewrite() {
    let (vfs, memfs) = setup();
    let f = vfs
        .open("/t", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    vfs.write(&f, b"abcdef").unwrap();
    let inode = vfs.resolve("/t").unwrap().inode().clone();
    let index = inode.id().index;

    // 扩展：补零
    vfs.truncate(&f, 8).unwrap();
    assert_eq!(inode.size(), 8);
    assert_eq!(memfs.last().contents(index), b"abcdef\0\0");
    assert_eq!(f.position(), 6);

    // 缩短：读取以新长度为界
    vfs.truncate(&f, 3).unwrap();
    assert_eq!(inode.size(), 3);
    vfs.seek(&f, 0, SeekWhence::Set).unwrap();
    let mut buf = [0u8; 16];
    let n = vfs.read(&f, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"abc");
    vfs.close(&f).unwrap();

    let dir = vfs.open("/", OpenFlags::O_RDONLY, mode(0)).unwrap();
    assert_eq!(vfs.truncate(&dir, 0).unwrap_err(), FsError::InvalidArgument);
    vfs.close(&dir).unwrap();
}

#[test]
fn test_open_trunc() {
    let (vfs, _) = setup();
    let f = vfs
        .open("/t", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    vfs.write(&f, b"abcdef").unwrap();
    vfs.close(&f).unwrap();

    let f = vfs
        .open("/t", OpenFlags::O_WRONLY | OpenFlags::O_TRUNC, mode(0))
        .unwrap();
    assert_eq!(vfs.resolve("/t").unwrap().inode().size(), 0);
    vfs.close(&f).unwrap();
}

#[test]
fn test_ioctl_falls_back_to_inode() {
    let (vfs, _) = setup();
    let f = vfs
        .open("/i", rw() | OpenFlags::O_CREAT, mode(0o644))
        .unwrap();
    let index = vfs.resolve("/i").unwrap().inode().id().index;
    assert_eq!(vfs.ioctl(&f, IOCTL_MAGIC, 0).unwrap(), index as isize);
    assert_eq!(vfs.ioctl(&f, 1, 0).unwrap_err(), FsError::NotSupported);
    vfs.close(&f).unwrap();
}

#[test]
fn test_directory_reader() {
    let (vfs, _) = setup();
    vfs.mkdir("/d", mode(0o755)).unwrap();
    vfs.create("/d/one", mode(0o644)).unwrap();
    vfs.mkdir("/d/two", mode(0o755)).unwrap();
    vfs.mount("ram1", "/d/mnt", "memfs").unwrap();

    let dir = vfs.open("/d", OpenFlags::O_RDONLY, mode(0)).unwrap();
    let d_inode = vfs.resolve("/d").unwrap().inode().clone();
    let root_id = vfs.root().unwrap().inode().id();

    let mut names = Vec::new();
    let mut buf = [0u8; Dirent::SIZE];
    loop {
        match vfs.read(&dir, &mut buf) {
            Ok(n) => {
                assert_eq!(n, Dirent::SIZE);
                let entry = Dirent::read_from(&buf).unwrap();
                if entry.name() == "." {
                    assert_eq!(entry.d_ino, d_inode.id().index);
                }
                if entry.name() == ".." {
                    assert_eq!(entry.d_ino, root_id.index);
                }
                names.push(entry.name().to_string());
            }
            Err(e) => {
                assert_eq!(e, FsError::NotFound);
                break;
            }
        }
    }
    assert_eq!(names, [".", "..", "one", "two", "mnt"]);
    assert_eq!(dir.position(), 5);

    let mut small = [0u8; 8];
    vfs.seek(&dir, 0, SeekWhence::Set).unwrap();
    assert_eq!(
        vfs.read(&dir, &mut small).unwrap_err(),
        FsError::InvalidArgument
    );
    vfs.close(&dir).unwrap();
}

#[test]
fn test_directory_reader_keeps_long_names() {
    let (vfs, _) = setup();
    vfs.mkdir("/d", mode(0o755)).unwrap();
    let long = "x".repeat(100);
    // 多字节字符跨过旧的截断位置
    let wide = "é".repeat(100);
    let max = "m".repeat(vfs::config::NAME_MAX);
    for name in [&long, &wide, &max] {
        vfs.create(&format!("/d/{name}"), mode(0o644)).unwrap();
    }

    let dir = vfs.open("/d", OpenFlags::O_RDONLY, mode(0)).unwrap();
    let mut buf = [0u8; Dirent::SIZE];
    let mut names = Vec::new();
    while let Ok(n) = vfs.read(&dir, &mut buf) {
        assert_eq!(n, Dirent::SIZE);
        names.push(Dirent::read_from(&buf).unwrap().name().to_string());
    }
    vfs.close(&dir).unwrap();

    for name in [&long, &wide, &max] {
        assert!(names.contains(name), "{} bytes missing", name.len());
        assert!(vfs.resolve(&format!("/d/{name}")).is_ok());
    }
}
