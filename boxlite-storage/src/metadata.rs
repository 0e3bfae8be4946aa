//! Daemon metadata store handle.
//!
//! Backends receive a handle at construction but keep all of their durable
//! state on disk; the handle is there for backends that need to persist
//! records of their own.

use std::collections::HashMap;
use std::sync::Arc;

use boxlite_shared::errors::StorageResult;
use parking_lot::RwLock;

/// Key/value store for opaque daemon records.
pub trait MetadataStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removing a missing key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Shared handle passed to backend constructors.
pub type MetadataHandle = Arc<dyn MetadataStore>;

/// In-process [`MetadataStore`].
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle() -> MetadataHandle {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
