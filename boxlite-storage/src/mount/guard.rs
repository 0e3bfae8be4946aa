//! Mount guard with RAII cleanup.

use std::path::{Path, PathBuf};

use boxlite_shared::errors::StorageResult;

/// Releases a transient mount when it goes out of scope.
///
/// Use [`MountGuard::release`] on the success path so a failed release is
/// reported to the caller. When the guard is dropped instead (early return,
/// `?`), the release still runs and a failure is only logged, leaving the
/// original error intact.
pub struct MountGuard<F>
where
    F: FnOnce(&Path) -> StorageResult<()>,
{
    target: PathBuf,
    release: Option<F>,
}

impl<F> MountGuard<F>
where
    F: FnOnce(&Path) -> StorageResult<()>,
{
    pub fn new(target: PathBuf, release: F) -> Self {
        Self {
            target,
            release: Some(release),
        }
    }

    /// Explicitly release. Called automatically on drop.
    pub fn release(mut self) -> StorageResult<()> {
        match self.release.take() {
            Some(release) => release(&self.target),
            None => Ok(()),
        }
    }
}

impl<F> Drop for MountGuard<F>
where
    F: FnOnce(&Path) -> StorageResult<()>,
{
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(e) = release(&self.target) {
                tracing::warn!(
                    error = %e,
                    target = %self.target.display(),
                    "Failed to release mount on drop"
                );
            } else {
                tracing::debug!(target = %self.target.display(), "Released mount on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxlite_shared::StorageError;
    use std::cell::Cell;
    use std::io;

    fn fallible(fail: bool) -> Result<(), io::Error> {
        if fail {
            Err(io::Error::other("copy failed"))
        } else {
            Ok(())
        }
    }

    #[test]
    fn test_release_runs_once() {
        let calls = Cell::new(0);
        let guard = MountGuard::new(PathBuf::from("/mnt/c1/rootfs"), |target| {
            assert_eq!(target, Path::new("/mnt/c1/rootfs"));
            calls.set(calls.get() + 1);
            Ok(())
        });

        guard.release().unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let calls = Cell::new(0);
        {
            let _guard = MountGuard::new(PathBuf::from("/mnt/c1/rootfs"), |_| {
                calls.set(calls.get() + 1);
                Ok(())
            });
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_release_error_is_returned() {
        let guard = MountGuard::new(PathBuf::from("/mnt/busy"), |target| {
            Err(StorageError::mount(target, io::Error::from_raw_os_error(16)))
        });

        let err = guard.release().unwrap_err();
        assert_eq!(err.io_error().and_then(|e| e.raw_os_error()), Some(16));
    }

    #[test]
    fn test_early_return_keeps_original_error() {
        let released = Cell::new(false);

        let run = || -> Result<(), io::Error> {
            let _guard = MountGuard::new(PathBuf::from("/mnt/c2/rootfs"), |target| {
                released.set(true);
                Err(StorageError::mount(target, io::Error::from_raw_os_error(22)))
            });
            fallible(true)?;
            Ok(())
        };

        let err = run().unwrap_err();
        assert_eq!(err.to_string(), "copy failed");
        assert!(released.get());
    }
}
