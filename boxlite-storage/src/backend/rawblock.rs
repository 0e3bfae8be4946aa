//! Raw block storage backend.
//!
//! Container root filesystems and volumes are preformatted images handed to
//! the guest as block devices. Nothing is mounted on the host for the guest;
//! the host only mounts an image briefly to inject files.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use boxlite_shared::constants::{drivers, formats};
use boxlite_shared::errors::StorageResult;
use boxlite_shared::{UserVolume, VolumeDescriptor};

use super::{Storage, StorageEnv, StorageInfo};
use crate::constants::modes;
use crate::disk::{BlockImages, ImageFs, Owner};
use crate::fs::{FileAttrs, FileInjector, ensure_dir, validate_component};
use crate::layout::StorageLayout;
use crate::metadata::MetadataHandle;
use crate::mount::MountGuard;

pub struct RawBlockStorage {
    root_path: PathBuf,
    layout: StorageLayout,
    image_fs: ImageFs,
    volume_size_bytes: u64,
    block_images: Arc<dyn BlockImages>,
    injector: Arc<dyn FileInjector>,
    #[allow(dead_code)] // Held for backends that persist records, not read here
    metadata: MetadataHandle,
}

impl RawBlockStorage {
    pub fn new(env: &StorageEnv) -> Self {
        let options = &env.options;
        let layout = options.layout();
        Self {
            root_path: layout.rawblock_dir(),
            layout,
            image_fs: ImageFs {
                fstype: options.block_fstype.clone(),
                mkfs_options: options.mkfs_options.clone(),
                mount_options: options.mount_options.clone(),
            },
            volume_size_bytes: options.volume_size_bytes,
            block_images: Arc::clone(&env.block_images),
            injector: Arc::clone(&env.injector),
            metadata: Arc::clone(&env.metadata),
        }
    }

    /// Registry constructor.
    pub fn factory(_info: &StorageInfo, env: &StorageEnv) -> StorageResult<Box<dyn Storage>> {
        env.options.validate()?;
        Ok(Box::new(Self::new(env)))
    }
}

impl Storage for RawBlockStorage {
    fn storage_type(&self) -> &'static str {
        drivers::RAWBLOCK
    }

    fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn init(&self) -> StorageResult<()> {
        let volumes_dir = self.layout.block_volumes_dir();
        ensure_dir(&volumes_dir, modes::VOLUMES_DIR)?;

        tracing::debug!(volumes_dir = %volumes_dir.display(), "Raw block storage ready");
        Ok(())
    }

    fn clean_up(&self) -> StorageResult<()> {
        Ok(())
    }

    fn prepare_container(
        &self,
        container_id: &str,
        _shared_dir: &Path,
        read_only: bool,
    ) -> StorageResult<VolumeDescriptor> {
        validate_component("container id", container_id)?;
        let image = self
            .layout
            .block_image(container_id)
            .to_string_lossy()
            .into_owned();

        tracing::debug!(container_id, image = %image, read_only, "Prepared container block image");

        Ok(VolumeDescriptor {
            name: image.clone(),
            source: image,
            fstype: self.image_fs.fstype.clone(),
            format: formats::RAW.to_string(),
            read_only,
        })
    }

    fn cleanup_container(&self, _container_id: &str, _shared_dir: &Path) -> StorageResult<()> {
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
        self.block_images.attach(
            &self.layout.blocks_dir(),
            base_dir,
            container_id,
            &self.image_fs,
            Owner {
                uid: attrs.uid,
                gid: attrs.gid,
            },
        )?;

        let guard = MountGuard::new(
            StorageLayout::container_rootfs(base_dir, container_id),
            |_| self.block_images.detach(base_dir, container_id),
        );

        self.injector
            .copy_into(src, container_id, target, base_dir, attrs)?;
        guard.release()
    }

    fn create_volume(&self, pod_id: &str, spec: &mut UserVolume) -> StorageResult<()> {
        validate_component("pod id", pod_id)?;
        validate_component("volume name", &spec.name)?;

        let image = self.layout.block_volume(pod_id, &spec.name);
        self.block_images
            .create(&image, &self.image_fs, self.volume_size_bytes)?;

        spec.source = image.to_string_lossy().into_owned();
        spec.fstype = self.image_fs.fstype.clone();
        spec.format = formats::RAW.to_string();
        Ok(())
    }

    fn remove_volume(&self, _pod_id: &str, _record: &[u8]) -> StorageResult<()> {
        Ok(())
    }
}
