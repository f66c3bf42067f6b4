// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryBackend;

fn sealed_store() -> (Arc<dyn Storage>, EncryptedStorage) {
    let inner: Arc<dyn Storage> = Arc::new(MemoryBackend::new());
    let key = EncryptionKey::from_material(b"correct horse battery staple");
    let sealed = EncryptedStorage::new(Arc::clone(&inner), &key).unwrap();
    (inner, sealed)
}

#[tokio::test]
async fn values_are_opaque_at_rest() {
    let (inner, sealed) = sealed_store();
    sealed.set("secret", "launch codes").await.unwrap();

    let raw = inner.get("secret").await.unwrap().unwrap();
    assert_ne!(raw, "launch codes");
    assert!(!raw.contains("launch"));

    // The stored form carries the version tag.
    let bytes = BASE64.decode(&raw).unwrap();
    assert_eq!(bytes[0], VERSION_TAG);

    assert_eq!(
        sealed.get("secret").await.unwrap().as_deref(),
        Some("launch codes")
    );
}

#[tokio::test]
async fn plaintext_rows_in_mixed_store_pass_through() {
    let (inner, sealed) = sealed_store();
    inner.set("legacy", "written before encryption").await.unwrap();

    assert_eq!(
        sealed.get("legacy").await.unwrap().as_deref(),
        Some("written before encryption")
    );
}

#[tokio::test]
async fn cas_operates_on_plaintext_expectations() {
    let (_, sealed) = sealed_store();
    sealed.set("doc", "v1").await.unwrap();

    assert!(!sealed.compare_and_swap("doc", Some("zz"), "v2").await.unwrap());
    assert!(sealed.compare_and_swap("doc", Some("v1"), "v2").await.unwrap());
    assert_eq!(sealed.get("doc").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test]
async fn atomic_update_transform_sees_plaintext() {
    let (_, sealed) = sealed_store();
    sealed.set("doc", "a").await.unwrap();

    let out = sealed
        .atomic_update("doc", &|cur| Ok(format!("{}b", cur.unwrap_or_default())))
        .await
        .unwrap();
    assert_eq!(out, "ab");
    assert_eq!(sealed.get("doc").await.unwrap().as_deref(), Some("ab"));
}

#[tokio::test]
async fn counters_stay_numeric() {
    let (inner, sealed) = sealed_store();
    assert_eq!(sealed.atomic_increment("seq").await.unwrap(), 1);
    assert_eq!(inner.get("seq").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn get_all_decrypts_values() {
    let (_, sealed) = sealed_store();
    sealed.set("agents:ada", "one").await.unwrap();
    sealed.set("agents:bob", "two").await.unwrap();

    let all = sealed.get_all("agents:").await.unwrap();
    assert_eq!(
        all,
        vec![
            ("agents:ada".to_string(), "one".to_string()),
            ("agents:bob".to_string(), "two".to_string()),
        ]
    );
}

#[test]
fn same_material_derives_same_key() {
    let a = EncryptionKey::from_material(b"k");
    let b = EncryptionKey::from_material(b"k");
    assert_eq!(a.0, b.0);
}

#[test]
fn resolve_rejects_empty_material() {
    assert!(matches!(
        EncryptionKey::resolve(""),
        Err(StorageError::Encryption(_))
    ));
}

#[test]
fn resolve_reads_key_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("room.key");
    std::fs::write(&path, b"file material").unwrap();

    let from_file = EncryptionKey::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(from_file.0, EncryptionKey::from_material(b"file material").0);
}

#[tokio::test]
async fn wrong_key_fails_closed() {
    let inner: Arc<dyn Storage> = Arc::new(MemoryBackend::new());
    let a = EncryptedStorage::new(
        Arc::clone(&inner),
        &EncryptionKey::from_material(b"key-a"),
    )
    .unwrap();
    let b = EncryptedStorage::new(
        Arc::clone(&inner),
        &EncryptionKey::from_material(b"key-b"),
    )
    .unwrap();

    a.set("secret", "hidden").await.unwrap();
    assert!(matches!(
        b.get("secret").await,
        Err(StorageError::Encryption(_))
    ));
}
