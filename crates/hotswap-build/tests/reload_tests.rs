//! Reload coordination properties

use hotswap_build::{ReloadCoordinator, SymbolArtifact, LOCK_FILE_NAME};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn proptest_symbol_names_never_collide(
        existing in proptest::collection::btree_set(0u32..=100_000, 0..16),
        builds in 2usize..12,
    ) {
        let temp = TempDir::new().unwrap();
        for token in &existing {
            fs::write(temp.path().join(SymbolArtifact::new("game", *token).file_name()), b"").unwrap();
        }

        let mut coordinator = ReloadCoordinator::new(temp.path(), "game");
        let mut previous: Option<u32> = None;
        let mut seen = BTreeSet::new();

        for _ in 0..builds {
            let guard = coordinator.begin_module_build().unwrap();
            let token = guard.symbols().token();

            prop_assert!(temp.path().join(LOCK_FILE_NAME).exists());
            prop_assert!(!existing.contains(&token));
            prop_assert_ne!(Some(token), previous);
            prop_assert!(token <= 100_000);

            coordinator.end_module_build(guard).unwrap();
            prop_assert!(!temp.path().join(LOCK_FILE_NAME).exists());

            // Leave the artifact behind like a linker would
            fs::write(temp.path().join(SymbolArtifact::new("game", token).file_name()), b"").unwrap();
            prop_assert!(seen.insert(token));
            previous = Some(token);
        }
    }
}

#[test]
fn test_guard_drop_releases_lock() {
    let temp = TempDir::new().unwrap();
    let mut coordinator = ReloadCoordinator::new(temp.path(), "game");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = coordinator.begin_module_build().unwrap();
        panic!("compiler crashed");
    }));

    assert!(result.is_err());
    assert!(!temp.path().join(LOCK_FILE_NAME).exists());
}
