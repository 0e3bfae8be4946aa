//! Host-side storage backends for BoxLite sandboxes.
//!
//! The daemon learns the host's storage driver at startup, picks the matching
//! backend from a [`StorageRegistry`] and initializes it. From then on the
//! backend prepares container root filesystems for the guest, injects files
//! into them and provisions per-pod volumes.
//!
//! Two drivers ship with the crate:
//! - `overlay`: rootfs shared as a directory through an overlay union mount
//! - `rawblock`: rootfs and volumes handed over as preformatted image files

use std::io;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub mod backend;
pub mod constants;
pub mod disk;
pub mod fs;
pub mod layout;
pub mod metadata;
pub mod mount;
pub mod options;
mod util;

pub use backend::{Storage, StorageEnv, StorageInfo, StorageRegistry, open_storage};
pub use boxlite_shared::{ErrorKind, StorageError, StorageResult, UserVolume, VolumeDescriptor};
pub use fs::FileAttrs;
pub use layout::StorageLayout;
pub use metadata::{MemoryMetadataStore, MetadataHandle, MetadataStore};
pub use options::StorageOptions;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE: &str = "boxlite-storage.log";

/// Route tracing output to `{root}/logs/boxlite-storage.log`, rotated daily.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Only the first
/// successful call installs a subscriber; later calls return `Ok(())`.
pub fn init_logging(layout: &StorageLayout) -> StorageResult<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| StorageError::filesystem(&logs_dir, e))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE)
        .build(&logs_dir)
        .map_err(|e| StorageError::filesystem(&logs_dir, io::Error::other(e.to_string())))?;

    LOG_GUARD.get_or_init(move || {
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        util::register_to_tracing(non_blocking, env_filter);
        guard
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn log_contents(dir: &std::path::Path) -> String {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| fs::read_to_string(entry.unwrap().path()).ok())
            .collect()
    }

    #[test]
    fn test_init_logging_writes_file() {
        let temp = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp.path());

        init_logging(&layout).unwrap();
        init_logging(&layout).unwrap();

        let logs_dir = layout.logs_dir();
        let entries: Vec<_> = fs::read_dir(&logs_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);

        tracing::info!(driver = "rawblock", "storage logging ready");

        // The writer flushes from a background thread
        let mut contents = String::new();
        for _ in 0..50 {
            contents = log_contents(&logs_dir);
            if contents.contains("storage logging ready") {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
        assert!(contents.contains("storage logging ready"), "log: {:?}", contents);
    }
}
