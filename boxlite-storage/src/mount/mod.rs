//! Union mount helper.
//!
//! The overlay backend shares a container's root filesystem with the guest by
//! mounting its image layers as one union filesystem:
//! - `UnionMount` - contract the backend consumes
//! - `OverlayMounter` - Linux overlayfs implementation (mount(2) via nix)
//! - `MountGuard` - scoped release of a transient mount

use std::path::{Path, PathBuf};

use boxlite_shared::errors::StorageResult;

mod guard;
#[cfg(target_os = "linux")]
mod overlayfs;

pub use guard::MountGuard;
#[cfg(target_os = "linux")]
pub use overlayfs::OverlayMounter;

/// Mounts a container's layers as a union filesystem.
pub trait UnionMount: Send + Sync {
    /// Mount the layers of `container_id` (found below `backend_root`) at
    /// `{target_dir}/{container_id}/rootfs` and return that mount point.
    fn mount(
        &self,
        container_id: &str,
        backend_root: &Path,
        target_dir: &Path,
        extra_options: &str,
        read_only: bool,
    ) -> StorageResult<PathBuf>;

    /// Plain umount(2); fails if the target is busy or not mounted.
    fn unmount(&self, path: &Path) -> StorageResult<()>;
}
