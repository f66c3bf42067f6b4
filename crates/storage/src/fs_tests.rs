// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use masc_core::FakeClock;
use tempfile::tempdir;

fn backend(dir: &Path) -> FsBackend {
    FsBackend::new(dir).unwrap()
}

#[tokio::test]
async fn set_get_delete_round_trip() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    store.set("state", "{}").await.unwrap();
    assert_eq!(store.get("state").await.unwrap().as_deref(), Some("{}"));
    assert!(dir.path().join("state.json").exists());

    assert!(store.delete("state").await.unwrap());
    assert_eq!(store.get("state").await.unwrap(), None);
    assert!(!store.delete("state").await.unwrap());
}

#[tokio::test]
async fn nested_keys_map_to_directories() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    store.set("agents:ada", "{}").await.unwrap();
    assert!(dir.path().join("agents").join("ada.json").exists());
}

#[tokio::test]
async fn dotted_segments_keep_their_name() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    store.acquire_lock("file:foo.txt", "a", 60).await.unwrap();
    assert!(dir
        .path()
        .join("locks")
        .join("file")
        .join("foo.txt.json")
        .exists());
    assert!(dir
        .path()
        .join("locks")
        .join("file")
        .join("foo.txt.flock")
        .exists());
}

#[tokio::test]
async fn invalid_key_never_touches_disk() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    assert!(matches!(
        store.set("../escape", "x").await,
        Err(StorageError::InvalidKey(_))
    ));
    assert!(matches!(
        store.get("a/b").await,
        Err(StorageError::InvalidKey(_))
    ));
}

#[tokio::test]
async fn set_if_absent_uses_exclusive_create() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    assert!(store.set_if_absent("k", "v1").await.unwrap());
    assert!(!store.set_if_absent("k", "v2").await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));
}

#[tokio::test]
async fn compare_and_swap_guards_value() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    assert!(store.compare_and_swap("k", None, "v1").await.unwrap());
    assert!(!store.compare_and_swap("k", Some("zz"), "v2").await.unwrap());
    assert!(store.compare_and_swap("k", Some("v1"), "v2").await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test]
async fn atomic_increment_is_durable_and_monotonic() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    assert_eq!(store.atomic_increment("seq:message").await.unwrap(), 1);
    assert_eq!(store.atomic_increment("seq:message").await.unwrap(), 2);

    // A second backend over the same directory sees the counter.
    let other = backend(dir.path());
    assert_eq!(other.atomic_increment("seq:message").await.unwrap(), 3);
}

#[tokio::test]
async fn atomic_update_applies_transform() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    let out = store
        .atomic_update("doc", &|cur| {
            assert_eq!(cur, None);
            Ok("first".to_string())
        })
        .await
        .unwrap();
    assert_eq!(out, "first");

    let out = store
        .atomic_update("doc", &|cur| {
            Ok(format!("{}+second", cur.unwrap_or_default()))
        })
        .await
        .unwrap();
    assert_eq!(out, "first+second");
}

#[tokio::test]
async fn list_keys_scans_name_prefix_in_parent_dir() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    store.set("messages:000001", "a").await.unwrap();
    store.set("messages:000002", "b").await.unwrap();
    store.set("messages:100000", "c").await.unwrap();
    store.set("state", "s").await.unwrap();

    let keys = store.list_keys("messages:").await.unwrap();
    assert_eq!(
        keys,
        vec![
            "messages:000001".to_string(),
            "messages:000002".to_string(),
            "messages:100000".to_string(),
        ]
    );

    // Name-prefix narrowing within the parent directory.
    let keys = store.list_keys("messages:0000").await.unwrap();
    assert_eq!(keys.len(), 2);

    // Missing directory is an empty result, not an error.
    assert!(store.list_keys("nothing:here:").await.unwrap().is_empty());
}

#[tokio::test]
async fn get_all_pairs_sorted() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    store.set("agents:bob", "2").await.unwrap();
    store.set("agents:ada", "1").await.unwrap();

    let all = store.get_all("agents:").await.unwrap();
    assert_eq!(
        all,
        vec![
            ("agents:ada".to_string(), "1".to_string()),
            ("agents:bob".to_string(), "2".to_string()),
        ]
    );
}

#[tokio::test]
async fn lock_lifecycle_across_instances() {
    let dir = tempdir().unwrap();
    let a = backend(dir.path());
    let b = backend(dir.path());

    assert!(a.acquire_lock("file:foo.txt", "a", 60).await.unwrap());
    assert!(!b.acquire_lock("file:foo.txt", "b", 60).await.unwrap());
    assert!(!b.release_lock("file:foo.txt", "b").await.unwrap());
    assert!(a.release_lock("file:foo.txt", "a").await.unwrap());
    assert!(b.acquire_lock("file:foo.txt", "b", 60).await.unwrap());
}

#[tokio::test]
async fn expired_lock_is_reclaimed() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let store = FsBackend::with_clock(dir.path(), clock.clone()).unwrap();

    assert!(store.acquire_lock("k", "a", 30).await.unwrap());
    clock.advance(std::time::Duration::from_secs(31));
    assert!(store.acquire_lock("k", "b", 30).await.unwrap());
}

#[tokio::test]
async fn corrupt_lock_file_reads_as_absent() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    let lock_file = dir.path().join("locks").join("k.json");
    std::fs::create_dir_all(lock_file.parent().unwrap()).unwrap();
    std::fs::write(&lock_file, "{not json").unwrap();

    assert!(store.acquire_lock("k", "a", 60).await.unwrap());
}

#[tokio::test]
async fn same_owner_reacquire_and_extend() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());

    assert!(store.acquire_lock("k", "a", 60).await.unwrap());
    assert!(store.acquire_lock("k", "a", 120).await.unwrap());
    assert!(store.extend_lock("k", 300, "a").await.unwrap());
    assert!(!store.extend_lock("k", 300, "b").await.unwrap());
}

#[tokio::test]
async fn pubsub_is_not_supported() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());
    assert!(matches!(
        store.publish("c", "m").await,
        Err(StorageError::NotSupported(_))
    ));
}

#[tokio::test]
async fn health_check_probes_base_dir() {
    let dir = tempdir().unwrap();
    let store = backend(dir.path());
    assert!(store.health_check().await.unwrap());
}
