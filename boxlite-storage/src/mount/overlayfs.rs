//! Overlayfs mounting logic
//! Linux-specific module for mounting overlayfs

use std::fs;
use std::path::{Path, PathBuf};

use boxlite_shared::errors::{StorageError, StorageResult};
use nix::mount::{MntFlags, MsFlags, mount, umount2};

use super::UnionMount;
use crate::layout::{StorageLayout, overlay};

/// Overlayfs union mount over the layer store kept in the backend root.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayMounter;

impl OverlayMounter {
    pub fn new() -> Self {
        Self
    }

    /// Build the overlayfs data string for a container's layers.
    fn mount_data(
        container_id: &str,
        backend_root: &Path,
        extra_options: &str,
    ) -> StorageResult<String> {
        let layer_dir = backend_root.join(container_id);
        let lower_id_path = layer_dir.join(overlay::LOWER_ID_FILE);
        let lower_id = fs::read_to_string(&lower_id_path)
            .map_err(|e| StorageError::mount(&lower_id_path, e))?;

        let lower_dir = backend_root.join(lower_id.trim()).join(overlay::ROOT_DIR);
        let upper_dir = layer_dir.join(overlay::UPPER_DIR);
        let work_dir = layer_dir.join(overlay::WORK_DIR);

        let mut data = format!(
            "lowerdir={},upperdir={},workdir={}",
            lower_dir.display(),
            upper_dir.display(),
            work_dir.display()
        );
        if !extra_options.is_empty() {
            data.push(',');
            data.push_str(extra_options);
        }
        Ok(data)
    }
}

impl UnionMount for OverlayMounter {
    fn mount(
        &self,
        container_id: &str,
        backend_root: &Path,
        target_dir: &Path,
        extra_options: &str,
        read_only: bool,
    ) -> StorageResult<PathBuf> {
        let mount_point: PathBuf = StorageLayout::container_rootfs(target_dir, container_id);
        fs::create_dir_all(&mount_point).map_err(|e| StorageError::mount(&mount_point, e))?;

        let data = Self::mount_data(container_id, backend_root, extra_options)?;

        let mut flags = MsFlags::empty();
        if read_only {
            flags |= MsFlags::MS_RDONLY;
        }

        tracing::info!(
            container_id,
            mount_point = %mount_point.display(),
            read_only,
            "Mounting overlayfs"
        );
        tracing::debug!(data = %data, "Overlayfs mount data");

        mount(
            Some("overlay"),
            mount_point.as_path(),
            Some("overlay"),
            flags,
            Some(data.as_str()),
        )
        .map_err(|e| StorageError::mount(&mount_point, e))?;

        Ok(mount_point)
    }

    fn unmount(&self, path: &Path) -> StorageResult<()> {
        umount2(path, MntFlags::empty()).map_err(|e| StorageError::mount(path, e))?;

        tracing::debug!(target = %path.display(), "Overlayfs unmounted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxlite_shared::ErrorKind;
    use tempfile::TempDir;

    fn layer_store(root: &Path, container_id: &str, lower_id: &str) {
        let layer_dir = root.join(container_id);
        fs::create_dir_all(layer_dir.join("upper")).unwrap();
        fs::create_dir_all(layer_dir.join("work")).unwrap();
        fs::create_dir_all(root.join(lower_id).join("root")).unwrap();
        fs::write(layer_dir.join("lower-id"), format!("{}\n", lower_id)).unwrap();
    }

    #[test]
    fn test_mount_data() {
        let temp = TempDir::new().unwrap();
        layer_store(temp.path(), "c1", "base");

        let data = OverlayMounter::mount_data("c1", temp.path(), "").unwrap();
        let root = temp.path().display();
        assert_eq!(
            data,
            format!(
                "lowerdir={root}/base/root,upperdir={root}/c1/upper,workdir={root}/c1/work"
            )
        );
    }

    #[test]
    fn test_mount_data_extra_options() {
        let temp = TempDir::new().unwrap();
        layer_store(temp.path(), "c1", "base");

        let data = OverlayMounter::mount_data("c1", temp.path(), "index=off").unwrap();
        assert!(data.ends_with(",index=off"));
    }

    #[test]
    fn test_missing_lower_id_is_mount_failure() {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared");

        let err = OverlayMounter::new()
            .mount("ghost", temp.path(), &shared, "", false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MountFailure);
        assert_eq!(
            err.io_error().map(|e| e.kind()),
            Some(std::io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_unmount_not_mounted_fails() {
        let temp = TempDir::new().unwrap();
        let err = OverlayMounter::new()
            .unmount(temp.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MountFailure);
    }
}
