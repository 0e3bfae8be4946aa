//! Storage backend capability contract.

use std::io::Read;
use std::path::Path;

use boxlite_shared::errors::StorageResult;
use boxlite_shared::{UserVolume, VolumeDescriptor};

use crate::fs::FileAttrs;

/// A host storage technology able to expose container root filesystems and
/// volumes to the guest.
///
/// Callers only ever see `Box<dyn Storage>`. Implementations keep no
/// per-container bookkeeping in memory: mounts and images live on disk, and
/// anything else belongs in the metadata store. Calls for different
/// identifiers may run concurrently; calls that mount the same identifier
/// must be serialized by the caller.
pub trait Storage: Send + Sync {
    /// Stable driver name, e.g. "overlay".
    fn storage_type(&self) -> &'static str;

    /// Private storage root of this backend. Never changes once constructed.
    fn root_path(&self) -> &Path;

    /// Backend setup at daemon start. Idempotent.
    fn init(&self) -> StorageResult<()>;

    /// Release process-wide resources at daemon shutdown.
    fn clean_up(&self) -> StorageResult<()>;

    /// Make the container's root filesystem attachable to the guest.
    ///
    /// Anything mounted here stays in place for the guest; it is released by
    /// [`Storage::cleanup_container`].
    fn prepare_container(
        &self,
        container_id: &str,
        shared_dir: &Path,
        read_only: bool,
    ) -> StorageResult<VolumeDescriptor>;

    /// Tear down what [`Storage::prepare_container`] set up.
    fn cleanup_container(&self, container_id: &str, shared_dir: &Path) -> StorageResult<()>;

    /// Write `src` to `target` inside the container's filesystem without the
    /// guest running it. Any mount made for this is gone when the call
    /// returns, whatever the outcome.
    fn inject_file(
        &self,
        src: &mut dyn Read,
        container_id: &str,
        target: &Path,
        base_dir: &Path,
        attrs: FileAttrs,
    ) -> StorageResult<()>;

    /// Allocate storage for a pod volume and record it in `spec`
    /// (`source`, `fstype`, `format`).
    fn create_volume(&self, pod_id: &str, spec: &mut UserVolume) -> StorageResult<()>;

    /// Release a volume given its persisted record. The record is opaque here.
    fn remove_volume(&self, pod_id: &str, record: &[u8]) -> StorageResult<()>;
}
