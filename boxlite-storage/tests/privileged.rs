//! Tests against the real host collaborators.
//!
//! These need root plus overlayfs, loop devices and mkfs.xfs, so they are
//! ignored by default. Run with `cargo test -- --ignored` as root.

#![cfg(target_os = "linux")]

use std::fs;
use std::path::Path;

use boxlite_storage::backend::StorageRegistry;
use boxlite_storage::{
    MemoryMetadataStore, StorageEnv, StorageInfo, StorageOptions, UserVolume, open_storage,
};
use boxlite_test_utils::current_attrs;
use tempfile::TempDir;

fn host_env(root: &Path) -> StorageEnv {
    StorageEnv::host(StorageOptions::with_root(root), MemoryMetadataStore::handle())
}

#[test]
#[ignore = "requires root and overlayfs"]
fn overlay_real_mount_round_trip() {
    let temp = TempDir::new().unwrap();
    let env = host_env(temp.path());
    let storage =
        open_storage(&StorageRegistry::builtin(), &StorageInfo::new("overlay"), &env).unwrap();

    let root = storage.root_path();
    fs::create_dir_all(root.join("base/root/etc")).unwrap();
    fs::write(root.join("base/root/etc/os-release"), "ID=test\n").unwrap();
    fs::create_dir_all(root.join("c1/upper")).unwrap();
    fs::create_dir_all(root.join("c1/work")).unwrap();
    fs::write(root.join("c1/lower-id"), "base").unwrap();

    let shared = temp.path().join("shared");
    storage.prepare_container("c1", &shared, true).unwrap();
    assert_eq!(
        fs::read_to_string(shared.join("c1/rootfs/etc/os-release")).unwrap(),
        "ID=test\n"
    );

    storage.cleanup_container("c1", &shared).unwrap();
    assert!(storage.cleanup_container("c1", &shared).is_err());

    // The upper and work dirs are free again for the transient mount
    let base = temp.path().join("inject");
    let mut src: &[u8] = b"box\n";
    storage
        .inject_file(
            &mut src,
            "c1",
            Path::new("/etc/hostname"),
            &base,
            current_attrs(0o644),
        )
        .unwrap();
    assert_eq!(
        fs::read_to_string(root.join("c1/upper/etc/hostname")).unwrap(),
        "box\n"
    );
}

#[test]
#[ignore = "requires root, loop devices and mkfs.xfs"]
fn rawblock_real_volume_and_inject() {
    let temp = TempDir::new().unwrap();
    let mut options = StorageOptions::with_root(temp.path());
    options.volume_size_bytes = 512 * 1024 * 1024;
    let env = StorageEnv::host(options, MemoryMetadataStore::handle());
    let storage =
        open_storage(&StorageRegistry::builtin(), &StorageInfo::new("rawblock"), &env).unwrap();

    let mut spec = UserVolume::new("data");
    storage.create_volume("p1", &mut spec).unwrap();
    assert_eq!(fs::metadata(&spec.source).unwrap().len(), 512 * 1024 * 1024);

    // Reuse the formatted volume as a container image
    let blocks = storage.root_path().join("blocks");
    fs::create_dir_all(&blocks).unwrap();
    fs::rename(&spec.source, blocks.join("c1")).unwrap();

    let base = temp.path().join("inject");
    let mut src: &[u8] = b"nameserver 1.1.1.1\n";
    storage
        .inject_file(
            &mut src,
            "c1",
            Path::new("/etc/resolv.conf"),
            &base,
            current_attrs(0o644),
        )
        .unwrap();

    // Detached again: the mount point is an empty directory
    assert_eq!(fs::read_dir(base.join("c1/rootfs")).unwrap().count(), 0);
}
