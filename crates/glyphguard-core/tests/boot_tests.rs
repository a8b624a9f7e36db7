//! Integration tests for installation arbitration and the boot lifecycle.

use glyphguard_core::config::StoreConfig;
use glyphguard_core::{
    BootOutcome, DottedVersion, InstallationManifest, InstallationRegistry, Loader,
    MemoryOptionStore, OptionStore, OptionsActivator,
};
use proptest::prelude::*;
use semver::Version;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_manifest(location: &Path, version: &str, requires_host: Option<&str>) {
    std::fs::create_dir_all(location).unwrap();
    let mut manifest = serde_json::json!({"name": "glyphguard", "version": version});
    if let Some(req) = requires_host {
        manifest["requiresHost"] = serde_json::json!(req);
    }
    std::fs::write(
        InstallationManifest::path_for(location),
        serde_json::to_string(&manifest).unwrap(),
    )
    .unwrap();
}

fn arb_versions() -> impl Strategy<Value = (Vec<(u8, u8, u8)>, Vec<(u8, u8, u8)>)> {
    prop::collection::btree_set((0u8..4, 0u8..4, 0u8..4), 1..8).prop_flat_map(|set| {
        let ordered: Vec<_> = set.into_iter().collect();
        (Just(ordered.clone()), Just(ordered).prop_shuffle())
    })
}

fn registry_from(versions: &[(u8, u8, u8)]) -> InstallationRegistry {
    let registry = InstallationRegistry::new();
    for (major, minor, patch) in versions {
        let raw = format!("{}.{}.{}", major, minor, patch);
        registry
            .register(
                format!("/plugins/{}/glyphguard", raw),
                DottedVersion::parse(&raw).unwrap(),
            )
            .unwrap();
    }
    registry
}

proptest! {
    #[test]
    fn prop_selection_ignores_registration_order((ordered, shuffled) in arb_versions()) {
        let a = registry_from(&ordered).select().unwrap();
        let b = registry_from(&shuffled).select().unwrap();
        prop_assert_eq!(&a, &b);

        let (major, minor, patch) = ordered.iter().max().copied().unwrap();
        prop_assert_eq!(a.version.as_str(), format!("{}.{}.{}", major, minor, patch));
    }

    #[test]
    fn prop_late_registration_never_changes_selection(
        (ordered, _) in arb_versions(),
        late in (0u8..9, 0u8..9, 0u8..9),
    ) {
        let registry = registry_from(&ordered);
        let first = registry.select().unwrap();
        let raw = format!("{}.{}.{}", late.0, late.1, late.2);
        registry
            .register("/plugins/late/glyphguard", DottedVersion::parse(&raw).unwrap())
            .unwrap();
        prop_assert_eq!(registry.select().unwrap(), first);
    }
}

#[test]
fn test_equal_versions_pick_first_registered() {
    let registry = InstallationRegistry::new();
    for location in ["/plugins/one", "/plugins/two", "/plugins/three"] {
        registry
            .register(location, DottedVersion::parse("4.2.0").unwrap())
            .unwrap();
    }
    assert_eq!(
        registry.select().unwrap().location,
        Path::new("/plugins/one")
    );
}

#[tokio::test]
async fn test_boot_from_manifests() {
    let temp_dir = TempDir::new().unwrap();
    let old = temp_dir.path().join("theme/glyphguard");
    let new = temp_dir.path().join("plugin/glyphguard");
    write_manifest(&old, "4.0.1", None);
    write_manifest(&new, "4.1.0", Some(">=1.2"));

    let registry = Arc::new(InstallationRegistry::new());
    registry.register_location(&old, None).unwrap();
    registry.register_location(&new, None).unwrap();

    let store = Arc::new(MemoryOptionStore::new());
    let loader = Loader::new(
        registry,
        Arc::new(OptionsActivator::new(store.clone())),
        Version::new(1, 3, 0),
    );

    let active = loader.activate().await.unwrap();
    assert_eq!(active.location, new);
    assert!(store.get(StoreConfig::OPTIONS_KEY).unwrap().is_some());
}

#[test]
fn test_incompatible_runtime_halts_boot() {
    let temp_dir = TempDir::new().unwrap();
    let location = temp_dir.path().join("glyphguard");
    write_manifest(&location, "5.0.0", Some(">=2.0"));

    let registry = Arc::new(InstallationRegistry::new());
    registry.register_location(&location, None).unwrap();
    let loader = Loader::new(
        registry,
        Arc::new(OptionsActivator::new(Arc::new(MemoryOptionStore::new()))),
        Version::new(1, 9, 0),
    );

    match loader.boot() {
        BootOutcome::Failed(notice) => {
            assert!(notice.message.contains("1.9.0"));
            assert!(notice.message.contains(">=2.0"));
        }
        BootOutcome::Loaded(record) => panic!("unexpected boot of {:?}", record),
    }
}

#[tokio::test]
async fn test_uninstall_gated_on_last_installation() {
    let store = Arc::new(MemoryOptionStore::new());
    let registry = Arc::new(InstallationRegistry::new());
    registry
        .register("/plugins/a", DottedVersion::parse("4.0.0").unwrap())
        .unwrap();
    registry
        .register("/plugins/b", DottedVersion::parse("4.1.0").unwrap())
        .unwrap();

    let loader = Loader::new(
        registry,
        Arc::new(OptionsActivator::new(store.clone())),
        Version::new(1, 0, 0),
    );
    loader.activate().await.unwrap();

    assert!(!loader.maybe_uninstall().await.unwrap());
    assert!(store.get(StoreConfig::OPTIONS_KEY).unwrap().is_some());

    // A fresh boot after one copy was removed.
    let registry = Arc::new(InstallationRegistry::new());
    registry
        .register("/plugins/b", DottedVersion::parse("4.1.0").unwrap())
        .unwrap();
    let loader = Loader::new(
        registry,
        Arc::new(OptionsActivator::new(store.clone())),
        Version::new(1, 0, 0),
    );
    assert!(loader.maybe_uninstall().await.unwrap());
    assert!(store.get(StoreConfig::OPTIONS_KEY).unwrap().is_none());
    assert!(store
        .get(StoreConfig::UNREGISTERED_CLIENTS_KEY)
        .unwrap()
        .is_none());
}
