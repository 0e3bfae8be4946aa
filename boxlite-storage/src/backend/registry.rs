//! Storage backend registry.
//!
//! Maps a host-reported storage driver name to the constructor of the
//! backend that serves it. The table is an ordinary value: the daemon builds
//! it once during startup and hands it by reference to whoever selects the
//! backend. Entries are only ever appended.

use boxlite_shared::constants::drivers;
use boxlite_shared::errors::{StorageError, StorageResult};

use super::{OverlayStorage, RawBlockStorage, Storage, StorageEnv, StorageInfo};

/// Type alias for backend constructor functions.
pub type StorageFactoryFn = fn(&StorageInfo, &StorageEnv) -> StorageResult<Box<dyn Storage>>;

/// Registration entry for one storage driver.
pub struct StorageRegistration {
    pub driver: String,
    pub factory: StorageFactoryFn,
}

/// Append-only table of storage drivers.
#[derive(Default)]
pub struct StorageRegistry {
    entries: Vec<StorageRegistration>,
}

impl StorageRegistry {
    /// A registry with no drivers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The drivers shipped with BoxLite: overlay and rawblock.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                StorageRegistration {
                    driver: drivers::OVERLAY.to_string(),
                    factory: OverlayStorage::factory,
                },
                StorageRegistration {
                    driver: drivers::RAWBLOCK.to_string(),
                    factory: RawBlockStorage::factory,
                },
            ],
        }
    }

    /// Add a driver. Registering a name twice is an error; existing entries
    /// are never replaced.
    pub fn register(
        &mut self,
        driver: impl Into<String>,
        factory: StorageFactoryFn,
    ) -> StorageResult<()> {
        let driver = driver.into();
        if self.is_registered(&driver) {
            return Err(StorageError::Config(format!(
                "storage driver '{}' is already registered",
                driver
            )));
        }

        tracing::debug!(driver = %driver, "Registered storage driver");
        self.entries.push(StorageRegistration { driver, factory });
        Ok(())
    }

    /// Construct the backend for `info.driver`.
    ///
    /// # Returns
    /// * `Ok(Box<dyn Storage>)` - Backend built by the registered constructor
    /// * `Err(StorageError::UnsupportedDriver)` - No entry for the driver name
    pub fn select(&self, info: &StorageInfo, env: &StorageEnv) -> StorageResult<Box<dyn Storage>> {
        if let Some(registration) = self.entries.iter().find(|r| r.driver == info.driver) {
            tracing::debug!(driver = %info.driver, "Creating storage backend");
            return (registration.factory)(info, env);
        }

        tracing::error!(
            driver = %info.driver,
            available = ?self.drivers(),
            "Storage driver is not supported"
        );
        Err(StorageError::UnsupportedDriver(info.driver.clone()))
    }

    /// Check if a driver name is registered.
    pub fn is_registered(&self, driver: &str) -> bool {
        self.entries.iter().any(|r| r.driver == driver)
    }

    /// All registered driver names, in registration order.
    pub fn drivers(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.driver.as_str()).collect()
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::metadata::MemoryMetadataStore;
    use crate::options::StorageOptions;
    use boxlite_shared::ErrorKind;
    use tempfile::TempDir;

    fn env(root: &std::path::Path) -> StorageEnv {
        StorageEnv::host(StorageOptions::with_root(root), MemoryMetadataStore::handle())
    }

    fn always_fails(_: &StorageInfo, _: &StorageEnv) -> StorageResult<Box<dyn Storage>> {
        Err(StorageError::Config("not today".into()))
    }

    #[test]
    fn test_builtin_drivers() {
        let registry = StorageRegistry::builtin();
        assert_eq!(registry.drivers(), vec!["overlay", "rawblock"]);
        assert!(registry.is_registered("overlay"));
        assert!(!registry.is_registered("devicemapper"));
    }

    #[test]
    fn test_select_matches_type() {
        let temp = TempDir::new().unwrap();
        let env = env(temp.path());
        let registry = StorageRegistry::builtin();

        for driver in registry.drivers() {
            let storage = registry.select(&StorageInfo::new(driver), &env).unwrap();
            assert_eq!(storage.storage_type(), driver);
        }
    }

    #[test]
    fn test_select_unknown_driver() {
        let temp = TempDir::new().unwrap();
        let registry = StorageRegistry::builtin();

        let err = registry
            .select(&StorageInfo::new("aufs"), &env(temp.path()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDriver);
        assert!(matches!(err, StorageError::UnsupportedDriver(ref name) if name == "aufs"));
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        let temp = TempDir::new().unwrap();
        let registry = StorageRegistry::empty();

        let result = registry.select(&StorageInfo::new("overlay"), &env(temp.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_register_custom_driver() {
        let temp = TempDir::new().unwrap();
        let mut registry = StorageRegistry::builtin();
        registry.register("nbd", always_fails).unwrap();

        assert_eq!(registry.drivers(), vec!["overlay", "rawblock", "nbd"]);
        let err = registry
            .select(&StorageInfo::new("nbd"), &env(temp.path()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = StorageRegistry::builtin();

        let err = registry.register("overlay", always_fails).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(registry.drivers(), vec!["overlay", "rawblock"]);
    }
}
