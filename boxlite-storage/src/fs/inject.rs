//! File injection into a mounted container tree.

use std::ffi::OsStr;
use std::fs::{File, Permissions};
use std::io::{self, Read};
use std::os::unix::fs::{PermissionsExt, fchown};
use std::path::{Component, Path};

use boxlite_shared::errors::{StorageError, StorageResult};
use nix::errno::Errno;
use nix::fcntl::{OFlag, openat};
use nix::libc::mode_t;
use nix::sys::stat::{Mode, mkdirat};

use crate::constants::modes;
use crate::layout::StorageLayout;

/// Permission bits and ownership of an injected file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileAttrs {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl FileAttrs {
    pub fn new(mode: u32, uid: u32, gid: u32) -> Self {
        Self { mode, uid, gid }
    }
}

/// Writes a stream into an already-mounted container tree.
pub trait FileInjector: Send + Sync {
    /// Write `src` to `target` inside `{base_dir}/{container_id}/rootfs`.
    fn copy_into(
        &self,
        src: &mut dyn Read,
        container_id: &str,
        target: &Path,
        base_dir: &Path,
        attrs: FileAttrs,
    ) -> StorageResult<()>;
}

/// Host implementation of [`FileInjector`] using plain file I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostInjector;

impl HostInjector {
    pub fn new() -> Self {
        Self
    }
}

/// Split a container path into its parent directories and file name,
/// refusing `..` components.
fn split_target(target: &Path) -> StorageResult<(Vec<&OsStr>, &OsStr)> {
    let mut parts = Vec::new();

    for component in target.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => parts.push(part),
            Component::ParentDir | Component::Prefix(_) => {
                return Err(StorageError::copy(
                    target,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "target must not leave the container root",
                    ),
                ));
            }
        }
    }

    match parts.pop() {
        Some(name) => Ok((parts, name)),
        None => Err(StorageError::copy(
            target,
            io::Error::new(io::ErrorKind::InvalidInput, "target names no file"),
        )),
    }
}

/// Open (creating if needed) the directory `name` below `parent` without
/// following a symlink.
fn open_child_dir(parent: &File, name: &OsStr) -> io::Result<File> {
    let flags = OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC;

    match openat(parent, name, flags, Mode::empty()) {
        Ok(fd) => return Ok(File::from(fd)),
        Err(Errno::ENOENT) => {}
        Err(e) => return Err(e.into()),
    }

    match mkdirat(parent, name, Mode::from_bits_truncate(modes::SHARED_DIR as mode_t)) {
        Ok(()) | Err(Errno::EEXIST) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(File::from(openat(parent, name, flags, Mode::empty())?))
}

/// Write `src` to `dirs/name` below `rootfs`. Every component is resolved
/// relative to its parent descriptor, so a symlink anywhere along the path
/// fails with `ELOOP` or `ENOTDIR` instead of leading out of the tree.
fn write_file(
    src: &mut dyn Read,
    rootfs: &Path,
    dirs: &[&OsStr],
    name: &OsStr,
    attrs: FileAttrs,
) -> io::Result<File> {
    let mut dir = File::open(rootfs)?;
    for part in dirs {
        dir = open_child_dir(&dir, part)?;
    }

    let fd = openat(
        &dir,
        name,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC,
        Mode::from_bits_truncate((attrs.mode & 0o777) as mode_t),
    )?;
    let mut file = File::from(fd);

    io::copy(src, &mut file)?;
    // chown clears setuid/setgid, so ownership goes first
    fchown(&file, Some(attrs.uid), Some(attrs.gid))?;
    file.set_permissions(Permissions::from_mode(attrs.mode))?;
    file.sync_all()?;
    Ok(file)
}

impl FileInjector for HostInjector {
    fn copy_into(
        &self,
        src: &mut dyn Read,
        container_id: &str,
        target: &Path,
        base_dir: &Path,
        attrs: FileAttrs,
    ) -> StorageResult<()> {
        let rootfs = StorageLayout::container_rootfs(base_dir, container_id);
        let (dirs, name) = split_target(target)?;
        let dest = rootfs.join(target.strip_prefix("/").unwrap_or(target));

        let file = write_file(src, &rootfs, &dirs, name, attrs)
            .map_err(|e| StorageError::copy(&dest, e))?;
        let size = file.metadata().map(|m| m.len()).unwrap_or_default();

        tracing::debug!(
            container_id,
            target = %target.display(),
            mode = %format!("{:04o}", attrs.mode),
            uid = attrs.uid,
            gid = attrs.gid,
            size,
            "Injected file"
        );
        Ok(())
    }
}
