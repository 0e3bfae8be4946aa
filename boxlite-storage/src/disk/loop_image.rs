//! Raw block images backed by sparse files and loop mounts.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::process::{Command, Output};

use boxlite_shared::errors::{StorageError, StorageResult};
use nix::mount::{MntFlags, umount2};
use nix::unistd::{Gid, Uid, chown};

use super::{BlockImages, ImageFs, Owner};
use crate::constants::{block, fstypes};
use crate::layout::StorageLayout;

/// Host implementation of [`BlockImages`].
///
/// Images are sparse files formatted with `mkfs.<fstype>`. Attaching goes
/// through mount(8) with the `loop` option, so the loop device is set up with
/// auto-clear and goes away together with the mount.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopImages;

impl LoopImages {
    pub fn new() -> Self {
        Self
    }

    /// Format an existing image file.
    fn format(path: &Path, image_fs: &ImageFs) -> StorageResult<()> {
        let mkfs = format!("mkfs.{}", image_fs.fstype);
        // mkfs.xfs refuses to overwrite without -f; the ext family uses -F
        let force = if image_fs.fstype == fstypes::XFS { "-f" } else { "-F" };

        tracing::info!(path = %path.display(), fstype = %image_fs.fstype, "Formatting block image");

        let output = Command::new(&mkfs)
            .arg(force)
            .args(image_fs.mkfs_options.split_whitespace())
            .arg(path)
            .output()
            .map_err(|e| StorageError::image(path, e))?;

        check_status(&mkfs, path, &output)
    }
}

fn check_status(program: &str, path: &Path, output: &Output) -> StorageResult<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(StorageError::image(
        path,
        io::Error::other(format!(
            "{} exited with code {:?}: {}",
            program,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )),
    ))
}

impl BlockImages for LoopImages {
    fn create(&self, path: &Path, image_fs: &ImageFs, size_bytes: u64) -> StorageResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| StorageError::image(path, e))?;
        file.set_len(size_bytes)
            .map_err(|e| StorageError::image(path, e))?;
        drop(file);

        if let Err(e) = Self::format(path, image_fs) {
            if let Err(remove_err) = fs::remove_file(path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "Failed to remove unformatted image"
                );
            }
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            size_mb = size_bytes / (1024 * 1024),
            "Created block image"
        );
        Ok(())
    }

    fn attach(
        &self,
        blocks_dir: &Path,
        mount_dir: &Path,
        container_id: &str,
        image_fs: &ImageFs,
        owner: Owner,
    ) -> StorageResult<()> {
        let image = blocks_dir.join(container_id);
        let mount_point = StorageLayout::container_rootfs(mount_dir, container_id);

        fs::create_dir_all(&mount_point).map_err(|e| StorageError::image(&mount_point, e))?;
        chown(
            mount_point.as_path(),
            Some(Uid::from_raw(owner.uid)),
            Some(Gid::from_raw(owner.gid)),
        )
        .map_err(|e| StorageError::image(&mount_point, e))?;

        let mut options = block::LOOP_OPTION.to_string();
        if !image_fs.mount_options.is_empty() {
            options.push(',');
            options.push_str(&image_fs.mount_options);
        }

        let output = Command::new("mount")
            .args(["-t", image_fs.fstype.as_str(), "-o", options.as_str()])
            .arg(&image)
            .arg(&mount_point)
            .output()
            .map_err(|e| StorageError::image(&image, e))?;
        check_status("mount", &image, &output)?;

        tracing::info!(
            image = %image.display(),
            mount_point = %mount_point.display(),
            "Attached block image"
        );
        Ok(())
    }

    fn detach(&self, mount_dir: &Path, container_id: &str) -> StorageResult<()> {
        let mount_point = StorageLayout::container_rootfs(mount_dir, container_id);
        umount2(mount_point.as_path(), MntFlags::empty())
            .map_err(|e| StorageError::image(&mount_point, e))?;

        tracing::debug!(mount_point = %mount_point.display(), "Detached block image");
        Ok(())
    }
}
