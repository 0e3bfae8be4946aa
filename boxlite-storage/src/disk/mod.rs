//! Block image operations.
//!
//! This module provides the raw block image contract and its host side:
//! - `BlockImages` - create, attach and detach preformatted images
//! - `ImageFs` - filesystem an image is formatted with and mounted as
//! - `LoopImages` - Linux implementation (sparse file, mkfs, loop mount)

use std::path::Path;

use boxlite_shared::errors::StorageResult;

#[cfg(target_os = "linux")]
mod loop_image;

#[cfg(target_os = "linux")]
pub use loop_image::LoopImages;

/// Filesystem of a block image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFs {
    /// Filesystem type, e.g. "xfs"
    pub fstype: String,
    /// Extra mkfs arguments, whitespace separated
    pub mkfs_options: String,
    /// Extra mount options, comma separated
    pub mount_options: String,
}

impl ImageFs {
    pub fn new(fstype: impl Into<String>) -> Self {
        Self {
            fstype: fstype.into(),
            mkfs_options: String::new(),
            mount_options: String::new(),
        }
    }
}

/// Owner applied to host-visible attachment points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// Creates and attaches raw block images.
pub trait BlockImages: Send + Sync {
    /// Create a fresh image of `size_bytes` at `path` and format it.
    fn create(&self, path: &Path, fs: &ImageFs, size_bytes: u64) -> StorageResult<()>;

    /// Mount image `{blocks_dir}/{container_id}` at `{mount_dir}/{container_id}/rootfs`.
    fn attach(
        &self,
        blocks_dir: &Path,
        mount_dir: &Path,
        container_id: &str,
        fs: &ImageFs,
        owner: Owner,
    ) -> StorageResult<()>;

    /// Undo [`BlockImages::attach`].
    fn detach(&self, mount_dir: &Path, container_id: &str) -> StorageResult<()>;
}
