//! Storage backend abstraction for the BoxLite runtime.

use std::sync::Arc;

use boxlite_shared::errors::StorageResult;
use serde::{Deserialize, Serialize};

pub mod overlay;
pub mod rawblock;
pub mod registry;
pub mod storage;

pub use overlay::OverlayStorage;
pub use rawblock::RawBlockStorage;
pub use registry::{StorageFactoryFn, StorageRegistration, StorageRegistry};
pub use storage::Storage;

use crate::disk::BlockImages;
use crate::fs::FileInjector;
use crate::metadata::MetadataHandle;
use crate::mount::UnionMount;
use crate::options::StorageOptions;

/// Storage configuration reported by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Storage driver name, e.g. "overlay"
    pub driver: String,
    /// Driver-specific key/value details, informational only
    #[serde(default)]
    pub driver_status: Vec<(String, String)>,
}

impl StorageInfo {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            driver_status: Vec::new(),
        }
    }
}

/// Everything a backend constructor gets besides the host info.
#[derive(Clone)]
pub struct StorageEnv {
    pub options: StorageOptions,
    pub metadata: MetadataHandle,
    pub union_mount: Arc<dyn UnionMount>,
    pub block_images: Arc<dyn BlockImages>,
    pub injector: Arc<dyn FileInjector>,
}

impl StorageEnv {
    pub fn new(
        options: StorageOptions,
        metadata: MetadataHandle,
        union_mount: Arc<dyn UnionMount>,
        block_images: Arc<dyn BlockImages>,
        injector: Arc<dyn FileInjector>,
    ) -> Self {
        Self {
            options,
            metadata,
            union_mount,
            block_images,
            injector,
        }
    }

    /// Environment backed by the host implementations (overlayfs, loop
    /// mounted images, plain file I/O).
    #[cfg(target_os = "linux")]
    pub fn host(options: StorageOptions, metadata: MetadataHandle) -> Self {
        use crate::disk::LoopImages;
        use crate::fs::HostInjector;
        use crate::mount::OverlayMounter;

        Self::new(
            options,
            metadata,
            Arc::new(OverlayMounter::new()),
            Arc::new(LoopImages::new()),
            Arc::new(HostInjector::new()),
        )
    }
}

impl std::fmt::Debug for StorageEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEnv")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Select the backend for `info.driver` and initialize it.
///
/// This is the daemon start path: a failure here is fatal to startup.
pub fn open_storage(
    registry: &StorageRegistry,
    info: &StorageInfo,
    env: &StorageEnv,
) -> StorageResult<Box<dyn Storage>> {
    let storage = registry.select(info, env)?;
    storage.init()?;

    tracing::info!(
        driver = storage.storage_type(),
        root = %storage.root_path().display(),
        "Storage backend initialized"
    );
    Ok(storage)
}
