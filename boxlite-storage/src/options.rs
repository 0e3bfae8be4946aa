//! Configuration for the storage layer.

use std::path::{Path, PathBuf};

use boxlite_shared::errors::{StorageError, StorageResult};
use dirs::home_dir;
use serde::{Deserialize, Serialize};

use crate::constants::{block, envs};
use crate::layout::{StorageLayout, dirs as const_dirs};

/// Options shared by every storage backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Storage root; each backend derives its private root below it.
    ///
    /// Default: `$BOXLITE_STORAGE_ROOT`, else `~/.boxlite/storage`
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Size of freshly created raw block volume images, in bytes.
    ///
    /// Default: 2 GiB (sparse)
    #[serde(default = "default_volume_size_bytes")]
    pub volume_size_bytes: u64,

    /// Filesystem raw block images are formatted with and mounted as.
    ///
    /// Default: xfs
    #[serde(default = "default_block_fstype")]
    pub block_fstype: String,

    /// Extra arguments passed to mkfs when formatting images
    #[serde(default)]
    pub mkfs_options: String,

    /// Extra mount options used when attaching images on the host
    #[serde(default)]
    pub mount_options: String,
}

fn default_root_dir() -> PathBuf {
    std::env::var(envs::BOXLITE_STORAGE_ROOT)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(const_dirs::BOXLITE_DIR);
            path.push(const_dirs::STORAGE_DIR);
            path
        })
}

fn default_volume_size_bytes() -> u64 {
    block::DEFAULT_VOLUME_SIZE_BYTES
}

fn default_block_fstype() -> String {
    block::DEFAULT_FSTYPE.to_string()
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            volume_size_bytes: default_volume_size_bytes(),
            block_fstype: default_block_fstype(),
            mkfs_options: String::new(),
            mount_options: String::new(),
        }
    }
}

impl StorageOptions {
    /// Default options rooted at `root_dir`.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| StorageError::filesystem(path, e))?;
        let options: StorageOptions = serde_json::from_str(&raw).map_err(|e| {
            StorageError::Config(format!("invalid options file {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.root_dir)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(StorageError::Config("storage root must not be empty".into()));
        }
        if self.volume_size_bytes == 0 {
            return Err(StorageError::Config(
                "volume size must be greater than zero".into(),
            ));
        }
        let fstype_ok = !self.block_fstype.is_empty()
            && self
                .block_fstype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !fstype_ok {
            return Err(StorageError::Config(format!(
                "invalid block filesystem type: '{}'",
                self.block_fstype
            )));
        }
        Ok(())
    }
}
