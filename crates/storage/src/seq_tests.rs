// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::backend::{LockInfo, StorageError, Transform};
use crate::memory::MemoryBackend;
use async_trait::async_trait;
use masc_core::FakeClock;

#[tokio::test]
async fn sequences_are_monotonic() {
    let seqs = SequenceService::new(Arc::new(MemoryBackend::new()));
    let a = seqs.next("seq:message").await;
    let b = seqs.next("seq:message").await;
    let c = seqs.next("seq:message").await;
    assert_eq!((a, b, c), (1, 2, 3));
}

#[tokio::test]
async fn counters_are_independent() {
    let seqs = SequenceService::new(Arc::new(MemoryBackend::new()));
    assert_eq!(seqs.next("seq:message").await, 1);
    assert_eq!(seqs.next("seq:event").await, 1);
    assert_eq!(seqs.peek("seq:message").await, 1);
    assert_eq!(seqs.peek("seq:missing").await, 0);
}

/// Storage stub whose every operation fails.
struct BrokenStorage;

#[async_trait]
impl crate::backend::Storage for BrokenStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::NotFound(key.to_string()))
    }
    async fn set(&self, _: &str, _: &str) -> Result<(), StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn delete(&self, _: &str) -> Result<bool, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn list_keys(&self, _: &str) -> Result<Vec<String>, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn get_all(&self, _: &str) -> Result<Vec<(String, String)>, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn set_if_absent(&self, _: &str, _: &str) -> Result<bool, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn compare_and_swap(
        &self,
        _: &str,
        _: Option<&str>,
        _: &str,
    ) -> Result<bool, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn atomic_increment(&self, _: &str) -> Result<u64, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn atomic_update(&self, _: &str, _: Transform<'_>) -> Result<String, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn acquire_lock(&self, _: &str, _: &str, _: i64) -> Result<bool, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn release_lock(&self, _: &str, _: &str) -> Result<bool, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn extend_lock(&self, _: &str, _: i64, _: &str) -> Result<bool, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn list_locks(&self) -> Result<Vec<(String, LockInfo)>, StorageError> {
        Err(StorageError::ConnectionFailed("down".into()))
    }
    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(false)
    }
}

#[tokio::test]
async fn backend_failure_falls_back_to_time() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(9_123_456_789);
    let seqs = SequenceService::with_clock(Arc::new(BrokenStorage), clock);

    // 9_123_456_789 mod 10^6
    assert_eq!(seqs.next("seq:message").await, 456_789);
}
