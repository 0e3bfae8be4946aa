//! Test doubles for the BoxLite storage layer.
//!
//! The fakes stand in for the privileged host collaborators (union mounts and
//! loop-mounted images) so backend behavior can be exercised as an ordinary
//! user. They touch the filesystem only inside the directories they are given.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use boxlite_shared::errors::{StorageError, StorageResult};
use boxlite_storage::disk::{BlockImages, ImageFs, Owner};
use boxlite_storage::fs::HostInjector;
use boxlite_storage::layout::StorageLayout;
use boxlite_storage::mount::UnionMount;
use boxlite_storage::{FileAttrs, MemoryMetadataStore, StorageEnv, StorageOptions};
use nix::unistd::{Gid, Uid};
use parking_lot::Mutex;
use tempfile::TempDir;

fn os_error(errno: i32) -> io::Error {
    io::Error::from_raw_os_error(errno)
}

// ============================================================================
// UNION MOUNT
// ============================================================================

/// In-memory [`UnionMount`]. A mount creates the rootfs directory and records
/// it as active; unmounting an inactive path fails with `EINVAL`.
#[derive(Default)]
pub struct FakeUnionMount {
    active: Mutex<HashSet<PathBuf>>,
    calls: Mutex<Vec<(String, bool)>>,
    fail_next: Mutex<Option<i32>>,
    delay: Option<Duration>,
    relocate_to: Option<PathBuf>,
}

impl FakeUnionMount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mount and unmount sleeps for `delay` before taking any lock.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Mount below `dir` regardless of the requested target directory.
    pub fn relocated(dir: impl Into<PathBuf>) -> Self {
        Self {
            relocate_to: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Make the next mount fail with `errno`.
    pub fn fail_next_mount(&self, errno: i32) {
        *self.fail_next.lock() = Some(errno);
    }

    pub fn is_mounted(&self, path: &Path) -> bool {
        self.active.lock().contains(path)
    }

    pub fn active_mounts(&self) -> usize {
        self.active.lock().len()
    }

    /// `(container_id, read_only)` of every mount attempt, in order.
    pub fn mount_calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().clone()
    }

    fn pause(&self) {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
    }
}

impl UnionMount for FakeUnionMount {
    fn mount(
        &self,
        container_id: &str,
        _backend_root: &Path,
        target_dir: &Path,
        _extra_options: &str,
        read_only: bool,
    ) -> StorageResult<PathBuf> {
        self.pause();
        self.calls
            .lock()
            .push((container_id.to_string(), read_only));

        let mount_dir = self.relocate_to.as_deref().unwrap_or(target_dir);
        let mount_point = StorageLayout::container_rootfs(mount_dir, container_id);
        if let Some(errno) = self.fail_next.lock().take() {
            return Err(StorageError::mount(&mount_point, os_error(errno)));
        }

        fs::create_dir_all(&mount_point).map_err(|e| StorageError::mount(&mount_point, e))?;
        if !self.active.lock().insert(mount_point.clone()) {
            return Err(StorageError::mount(&mount_point, os_error(libc::EBUSY)));
        }

        Ok(mount_point)
    }

    fn unmount(&self, path: &Path) -> StorageResult<()> {
        self.pause();
        if self.active.lock().remove(path) {
            Ok(())
        } else {
            Err(StorageError::mount(path, os_error(libc::EINVAL)))
        }
    }
}

// ============================================================================
// BLOCK IMAGES
// ============================================================================

/// [`BlockImages`] that writes plain sparse files and tracks attachments in
/// memory instead of formatting and loop-mounting them.
#[derive(Default)]
pub struct FakeBlockImages {
    created: Mutex<Vec<(PathBuf, String, u64)>>,
    attached: Mutex<HashSet<PathBuf>>,
    fail_next_attach: Mutex<Option<i32>>,
    fail_next_detach: Mutex<Option<i32>>,
}

impl FakeBlockImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_attach(&self, errno: i32) {
        *self.fail_next_attach.lock() = Some(errno);
    }

    pub fn fail_next_detach(&self, errno: i32) {
        *self.fail_next_detach.lock() = Some(errno);
    }

    /// `(path, fstype, size)` of every created image.
    pub fn created(&self) -> Vec<(PathBuf, String, u64)> {
        self.created.lock().clone()
    }

    pub fn is_attached(&self, mount_point: &Path) -> bool {
        self.attached.lock().contains(mount_point)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.lock().len()
    }
}

impl BlockImages for FakeBlockImages {
    fn create(&self, path: &Path, fs: &ImageFs, size_bytes: u64) -> StorageResult<()> {
        let file = fs::File::create(path).map_err(|e| StorageError::image(path, e))?;
        file.set_len(size_bytes)
            .map_err(|e| StorageError::image(path, e))?;

        self.created
            .lock()
            .push((path.to_path_buf(), fs.fstype.clone(), size_bytes));
        Ok(())
    }

    fn attach(
        &self,
        blocks_dir: &Path,
        mount_dir: &Path,
        container_id: &str,
        _fs: &ImageFs,
        _owner: Owner,
    ) -> StorageResult<()> {
        let image = blocks_dir.join(container_id);
        let mount_point = StorageLayout::container_rootfs(mount_dir, container_id);

        if let Some(errno) = self.fail_next_attach.lock().take() {
            return Err(StorageError::image(&mount_point, os_error(errno)));
        }
        if !image.is_file() {
            return Err(StorageError::image(&image, os_error(libc::ENOENT)));
        }

        fs::create_dir_all(&mount_point).map_err(|e| StorageError::image(&mount_point, e))?;
        if !self.attached.lock().insert(mount_point.clone()) {
            return Err(StorageError::image(&mount_point, os_error(libc::EBUSY)));
        }
        Ok(())
    }

    fn detach(&self, mount_dir: &Path, container_id: &str) -> StorageResult<()> {
        let mount_point = StorageLayout::container_rootfs(mount_dir, container_id);
        let removed = self.attached.lock().remove(&mount_point);

        if let Some(errno) = self.fail_next_detach.lock().take() {
            return Err(StorageError::image(&mount_point, os_error(errno)));
        }
        if removed {
            Ok(())
        } else {
            Err(StorageError::image(&mount_point, os_error(libc::EINVAL)))
        }
    }
}

// ============================================================================
// READERS
// ============================================================================

/// Reader that yields `prefix` and then fails.
pub struct FailingReader {
    prefix: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    pub fn new(prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.to_vec(),
            pos: 0,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.prefix.len() {
            let n = buf.len().min(self.prefix.len() - self.pos);
            buf[..n].copy_from_slice(&self.prefix[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"))
    }
}

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Temporary storage root wired to the fakes and the real [`HostInjector`].
pub struct TestStorage {
    pub temp: TempDir,
    pub union_mount: Arc<FakeUnionMount>,
    pub block_images: Arc<FakeBlockImages>,
    pub env: StorageEnv,
}

impl TestStorage {
    pub fn new() -> Self {
        Self::with_union_mount(FakeUnionMount::new())
    }

    pub fn with_union_mount(union_mount: FakeUnionMount) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let union_mount = Arc::new(union_mount);
        let block_images = Arc::new(FakeBlockImages::new());

        let env = StorageEnv::new(
            StorageOptions::with_root(temp.path().join("storage")),
            MemoryMetadataStore::handle(),
            union_mount.clone(),
            block_images.clone(),
            Arc::new(HostInjector::new()),
        );

        Self {
            temp,
            union_mount,
            block_images,
            env,
        }
    }

    pub fn root(&self) -> &Path {
        &self.env.options.root_dir
    }

    pub fn layout(&self) -> StorageLayout {
        self.env.options.layout()
    }

    /// Guest-visible shared directory, created on first use.
    pub fn shared_dir(&self) -> PathBuf {
        let dir = self.temp.path().join("shared");
        fs::create_dir_all(&dir).expect("Failed to create shared dir");
        dir
    }

    /// Write an empty image for `container_id` where rawblock expects it.
    pub fn seed_block_image(&self, container_id: &str) -> PathBuf {
        let blocks_dir = self.layout().blocks_dir();
        fs::create_dir_all(&blocks_dir).expect("Failed to create blocks dir");
        let image = blocks_dir.join(container_id);
        fs::write(&image, b"").expect("Failed to write block image");
        image
    }
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Attributes owned by the user running the tests.
pub fn current_attrs(mode: u32) -> FileAttrs {
    FileAttrs::new(mode, Uid::current().as_raw(), Gid::current().as_raw())
}
