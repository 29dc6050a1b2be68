mod common;

use common::*;
use mediatwin::{
    BackendConfig, HashAlgorithm, MediaStore, MediaTwin, MediaTwinConfig, RawMediaInput,
    SearchOptions, StoreConfig,
};
use serde_json::json;
use tempfile::TempDir;

fn redb_config(dir: &TempDir) -> MediaTwinConfig {
    let path = dir.path().join("library.redb");
    MediaTwinConfig {
        store: StoreConfig::new().with_backend(BackendConfig::redb(path.to_string_lossy())),
        ..MediaTwinConfig::default()
    }
}

#[test]
fn records_and_trees_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut twin = MediaTwin::new(redb_config(&dir)).unwrap();
        twin.connect().unwrap();
        twin.add(RawMediaInput::new(gradient_png(0)).with_id("kept").with_metadata(json!({"n": 1})))
            .unwrap();
        twin.add(RawMediaInput::new(encode_png(&checkerboard(8))).with_id("other"))
            .unwrap();
        twin.disconnect().unwrap();
    }

    let mut twin = MediaTwin::new(redb_config(&dir)).unwrap();
    twin.connect().unwrap();
    assert_eq!(twin.stats().unwrap().store.total, 2);
    assert_eq!(twin.stats().unwrap().trees[&HashAlgorithm::Structural].size, 2);

    let hits = twin
        .search(RawMediaInput::new(gradient_png(0)), &SearchOptions::default())
        .unwrap();
    assert_eq!(hits[0].id, "kept");
    assert_eq!(hits[0].metadata, json!({"n": 1}));
}

#[test]
fn removal_is_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let mut twin = MediaTwin::new(redb_config(&dir)).unwrap();
        twin.connect().unwrap();
        twin.add(RawMediaInput::new(gradient_png(0)).with_id("gone")).unwrap();
        assert!(twin.remove("gone").unwrap());
        twin.disconnect().unwrap();
    }

    let mut twin = MediaTwin::new(redb_config(&dir)).unwrap();
    twin.connect().unwrap();
    assert!(twin.get("gone").unwrap().is_none());
    let hits = twin
        .search(RawMediaInput::new(gradient_png(0)), &SearchOptions::default())
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn missing_snapshots_start_empty_until_rebuilt() {
    let dir = TempDir::new().unwrap();
    let mut config = redb_config(&dir);
    config.auto_persist = false;
    {
        let mut twin = MediaTwin::new(config.clone()).unwrap();
        twin.connect().unwrap();
        twin.add(RawMediaInput::new(gradient_png(0)).with_id("a")).unwrap();
        assert!(twin.store().load_tree(HashAlgorithm::Structural).unwrap().is_none());
        // Skip disconnect so no snapshot is ever written.
    }

    let mut twin = MediaTwin::new(config).unwrap();
    twin.connect().unwrap();
    let options = SearchOptions::default();
    assert!(twin.search(RawMediaInput::new(gradient_png(0)), &options).unwrap().is_empty());

    assert_eq!(twin.rebuild_index().unwrap(), 1);
    let hits = twin.search(RawMediaInput::new(gradient_png(0)), &options).unwrap();
    assert_eq!(hits[0].id, "a");
}

#[test]
fn corrupt_snapshot_is_rebuilt_on_connect() {
    let dir = TempDir::new().unwrap();
    {
        let mut twin = MediaTwin::new(redb_config(&dir)).unwrap();
        twin.connect().unwrap();
        twin.add(RawMediaInput::new(gradient_png(0)).with_id("a")).unwrap();
        twin.add(RawMediaInput::new(encode_png(&checkerboard(8))).with_id("b"))
            .unwrap();
        twin.disconnect().unwrap();
    }

    let mut twin = MediaTwin::new(redb_config(&dir)).unwrap();
    let store = twin.store().clone();
    store.connect().unwrap();
    let mut snapshot = store.load_tree(HashAlgorithm::Structural).unwrap().unwrap();
    snapshot.count += 1;
    store.save_tree(HashAlgorithm::Structural, &snapshot).unwrap();

    twin.connect().unwrap();
    assert_eq!(twin.stats().unwrap().trees[&HashAlgorithm::Structural].size, 2);
    let hits = twin
        .search(RawMediaInput::new(gradient_png(0)), &SearchOptions::default())
        .unwrap();
    assert_eq!(hits[0].id, "a");

    let repaired = store.load_tree(HashAlgorithm::Structural).unwrap().unwrap();
    assert_eq!(repaired.count, 2);
}
