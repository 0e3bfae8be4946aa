//! Host filesystem helpers shared by the backends.

use std::fs::{self, DirBuilder, Permissions};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use boxlite_shared::errors::{StorageError, StorageResult};

use crate::constants::modes;
use crate::layout::StorageLayout;

mod inject;

pub use inject::{FileAttrs, FileInjector, HostInjector};

/// Create `path` (and parents) and make sure it carries exactly `mode`.
///
/// Safe to call repeatedly; an existing directory gets its mode re-applied.
pub fn ensure_dir(path: &Path, mode: u32) -> StorageResult<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(|e| StorageError::filesystem(path, e))?;
    fs::set_permissions(path, Permissions::from_mode(mode))
        .map_err(|e| StorageError::filesystem(path, e))
}

/// Check that `value` is usable as a single path component.
///
/// Container ids, pod ids and volume names all end up joined into host
/// paths; anything that could climb out of the intended directory is refused.
pub fn validate_component(what: &str, value: &str) -> StorageResult<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\0');
    if invalid {
        return Err(StorageError::InvalidIdentifier(format!(
            "{} '{}' is not a valid path component",
            what,
            value.escape_default()
        )));
    }
    Ok(())
}

/// Allocate an empty directory volume for `(pod_id, name)`.
///
/// Returns the directory path. An existing directory is reused as-is.
pub fn create_vfs_volume(
    layout: &StorageLayout,
    pod_id: &str,
    name: &str,
) -> StorageResult<PathBuf> {
    validate_component("pod id", pod_id)?;
    validate_component("volume name", name)?;

    let path = layout.vfs_volume(pod_id, name);
    ensure_dir(&path, modes::SHARED_DIR)?;

    tracing::info!(pod_id, volume = name, path = %path.display(), "Created directory volume");
    Ok(path)
}
