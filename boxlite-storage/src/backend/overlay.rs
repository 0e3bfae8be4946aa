//! Overlay storage backend.
//!
//! Shares a container's root filesystem with the guest as a directory: the
//! image layers are union-mounted into the guest-visible shared directory and
//! the guest mounts that directory over the virtual filesystem channel.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use boxlite_shared::constants::{drivers, formats, fstypes};
use boxlite_shared::errors::StorageResult;
use boxlite_shared::{UserVolume, VolumeDescriptor};

use super::{Storage, StorageEnv, StorageInfo};
use crate::fs::{FileAttrs, FileInjector, create_vfs_volume, validate_component};
use crate::layout::StorageLayout;
use crate::metadata::MetadataHandle;
use crate::mount::{MountGuard, UnionMount};

pub struct OverlayStorage {
    root_path: PathBuf,
    layout: StorageLayout,
    union_mount: Arc<dyn UnionMount>,
    injector: Arc<dyn FileInjector>,
    #[allow(dead_code)] // Held for backends that persist records, not read here
    metadata: MetadataHandle,
}

impl OverlayStorage {
    pub fn new(env: &StorageEnv) -> Self {
        let layout = env.options.layout();
        Self {
            root_path: layout.overlay_dir(),
            layout,
            union_mount: Arc::clone(&env.union_mount),
            injector: Arc::clone(&env.injector),
            metadata: Arc::clone(&env.metadata),
        }
    }

    /// Registry constructor.
    pub fn factory(_info: &StorageInfo, env: &StorageEnv) -> StorageResult<Box<dyn Storage>> {
        env.options.validate()?;
        Ok(Box::new(Self::new(env)))
    }

    fn mount(
        &self,
        container_id: &str,
        target_dir: &Path,
        read_only: bool,
    ) -> StorageResult<PathBuf> {
        self.union_mount
            .mount(container_id, &self.root_path, target_dir, "", read_only)
            .inspect_err(|e| {
                tracing::error!(
                    container_id,
                    target_dir = %target_dir.display(),
                    error = %e,
                    "Failed to mount container to shared dir"
                );
            })
    }
}

impl Storage for OverlayStorage {
    fn storage_type(&self) -> &'static str {
        drivers::OVERLAY
    }

    fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    fn clean_up(&self) -> StorageResult<()> {
        Ok(())
    }

    fn prepare_container(
        &self,
        container_id: &str,
        shared_dir: &Path,
        read_only: bool,
    ) -> StorageResult<VolumeDescriptor> {
        validate_component("container id", container_id)?;
        let mount_point = self.mount(container_id, shared_dir, read_only)?;

        tracing::info!(
            container_id,
            mount_point = %mount_point.display(),
            read_only,
            "Prepared container rootfs"
        );

        let container_path = format!("/{}", container_id);
        Ok(VolumeDescriptor {
            name: container_path.clone(),
            source: container_path,
            fstype: fstypes::DIR.to_string(),
            format: formats::VFS.to_string(),
            read_only,
        })
    }

    fn cleanup_container(&self, container_id: &str, shared_dir: &Path) -> StorageResult<()> {
        validate_component("container id", container_id)?;
        let mount_point = StorageLayout::container_rootfs(shared_dir, container_id);
        self.union_mount.unmount(&mount_point)?;

        tracing::info!(container_id, mount_point = %mount_point.display(), "Cleaned up container rootfs");
        Ok(())
    }

    fn inject_file(
        &self,
        src: &mut dyn Read,
        container_id: &str,
        target: &Path,
        base_dir: &Path,
        attrs: FileAttrs,
    ) -> StorageResult<()> {
        validate_component("container id", container_id)?;
        let mount_point = self.mount(container_id, base_dir, false)?;
        let guard = MountGuard::new(mount_point, |mount_point| {
            self.union_mount.unmount(mount_point)
        });

        self.injector
            .copy_into(src, container_id, target, base_dir, attrs)?;
        guard.release()
    }

    fn create_volume(&self, pod_id: &str, spec: &mut UserVolume) -> StorageResult<()> {
        let path = create_vfs_volume(&self.layout, pod_id, &spec.name)?;

        spec.source = path.to_string_lossy().into_owned();
        spec.format = formats::VFS.to_string();
        spec.fstype = fstypes::DIR.to_string();
        Ok(())
    }

    fn remove_volume(&self, _pod_id: &str, _record: &[u8]) -> StorageResult<()> {
        Ok(())
    }
}
