//! Property tests for path derivation.

use std::path::Path;

use boxlite_storage::backend::{OverlayStorage, RawBlockStorage};
use boxlite_storage::{Storage, UserVolume};
use boxlite_test_utils::TestStorage;
use proptest::prelude::*;

fn component() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_.]{0,15}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn root_path_is_stable(ids in proptest::collection::vec(component(), 1..5)) {
        let ctx = TestStorage::new();
        let storage = RawBlockStorage::new(&ctx.env);
        let root = storage.root_path().to_path_buf();

        for id in &ids {
            storage.prepare_container(id, &ctx.shared_dir(), false).unwrap();
            prop_assert_eq!(storage.root_path(), root.as_path());
        }
    }

    #[test]
    fn rawblock_descriptor_names_image(id in component(), read_only in any::<bool>()) {
        let ctx = TestStorage::new();
        let storage = RawBlockStorage::new(&ctx.env);

        let descriptor = storage.prepare_container(&id, &ctx.shared_dir(), read_only).unwrap();
        prop_assert_eq!(Path::new(&descriptor.source), storage.root_path().join("blocks").join(&id));
        prop_assert_eq!(&descriptor.name, &descriptor.source);
        prop_assert_eq!(descriptor.read_only, read_only);
    }

    #[test]
    fn volume_paths_follow_pod_and_name(pod in component(), name in component()) {
        let ctx = TestStorage::new();

        let rawblock = RawBlockStorage::new(&ctx.env);
        rawblock.init().unwrap();
        let mut block_spec = UserVolume::new(name.clone());
        rawblock.create_volume(&pod, &mut block_spec).unwrap();
        prop_assert_eq!(
            Path::new(&block_spec.source),
            rawblock.root_path().join("volumes").join(format!("{}-{}", pod, name))
        );

        let overlay = OverlayStorage::new(&ctx.env);
        let mut dir_spec = UserVolume::new(name.clone());
        overlay.create_volume(&pod, &mut dir_spec).unwrap();
        let source = Path::new(&dir_spec.source);
        prop_assert!(source.ends_with(Path::new(&pod).join(&name)));
        prop_assert!(source.is_dir());
    }
}
