use std::path::{Path, PathBuf};

/// Directory structure constants
pub mod dirs {
    /// Base directory name for BoxLite data
    pub const BOXLITE_DIR: &str = ".boxlite";

    /// Storage root below the BoxLite home directory
    pub const STORAGE_DIR: &str = "storage";

    /// Overlay backend root
    pub const OVERLAY_DIR: &str = "overlay";

    /// Raw block backend root
    pub const RAWBLOCK_DIR: &str = "rawblock";

    /// Container images of the raw block backend
    pub const BLOCKS_DIR: &str = "blocks";

    /// Volume images of the raw block backend
    pub const VOLUMES_DIR: &str = "volumes";

    /// Directory volumes of the overlay backend
    pub const VFS_DIR: &str = "vfs";

    /// Container rootfs mount point name (every strategy mounts here)
    pub const ROOTFS_DIR: &str = "rootfs";

    /// Log files
    pub const LOGS_DIR: &str = "logs";
}

/// Overlay layer store layout (one directory per layer id).
///
/// ```text
/// {overlay root}/
/// ├── {container id}/
/// │   ├── lower-id     # id of the image layer below
/// │   ├── upper/
/// │   └── work/
/// └── {lower id}/
///     └── root/
/// ```
pub mod overlay {
    pub const LOWER_ID_FILE: &str = "lower-id";
    pub const UPPER_DIR: &str = "upper";
    pub const WORK_DIR: &str = "work";
    pub const ROOT_DIR: &str = "root";
}

// ============================================================================
// STORAGE LAYOUT (storage root)
// ============================================================================

/// Paths below the storage root.
///
/// ```text
/// {root}/
/// ├── overlay/                 # overlay backend root
/// ├── rawblock/                # raw block backend root
/// │   ├── blocks/{cid}         # container images
/// │   └── volumes/{pod}-{name} # volume images
/// ├── vfs/{pod}/{name}/        # directory volumes
/// └── logs/
/// ```
#[derive(Clone, Debug)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn overlay_dir(&self) -> PathBuf {
        self.root.join(dirs::OVERLAY_DIR)
    }

    pub fn rawblock_dir(&self) -> PathBuf {
        self.root.join(dirs::RAWBLOCK_DIR)
    }

    /// Container block images: {root}/rawblock/blocks
    pub fn blocks_dir(&self) -> PathBuf {
        self.rawblock_dir().join(dirs::BLOCKS_DIR)
    }

    /// Volume block images: {root}/rawblock/volumes
    pub fn block_volumes_dir(&self) -> PathBuf {
        self.rawblock_dir().join(dirs::VOLUMES_DIR)
    }

    pub fn vfs_dir(&self) -> PathBuf {
        self.root.join(dirs::VFS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(dirs::LOGS_DIR)
    }

    /// Image of one container: {root}/rawblock/blocks/{cid}
    pub fn block_image(&self, container_id: &str) -> PathBuf {
        self.blocks_dir().join(container_id)
    }

    /// Image of one pod volume: {root}/rawblock/volumes/{pod}-{name}
    pub fn block_volume(&self, pod_id: &str, name: &str) -> PathBuf {
        self.block_volumes_dir().join(format!("{}-{}", pod_id, name))
    }

    /// Directory of one pod volume: {root}/vfs/{pod}/{name}
    pub fn vfs_volume(&self, pod_id: &str, name: &str) -> PathBuf {
        self.vfs_dir().join(pod_id).join(name)
    }

    /// Where a container's filesystem is mounted below a shared or base
    /// directory: {dir}/{cid}/rootfs
    pub fn container_rootfs(dir: &Path, container_id: &str) -> PathBuf {
        dir.join(container_id).join(dirs::ROOTFS_DIR)
    }
}
