// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend.
//!
//! One process-wide container behind a single mutex. CAS and the lock
//! lifecycle are in-process; no pub/sub.

use async_trait::async_trait;
use masc_core::{validate_key, Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::backend::{clamp_ttl, LockInfo, Storage, StorageError, Transform};

#[derive(Default)]
struct Inner {
    kv: BTreeMap<String, String>,
    locks: HashMap<String, LockInfo>,
}

/// Memory-backed storage for single-process rooms and tests.
#[derive(Clone)]
pub struct MemoryBackend<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    clock: C,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryBackend<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    /// Read a lock, dropping it if expired.
    fn live_lock(inner: &mut Inner, key: &str, now: u64) -> Option<LockInfo> {
        match inner.locks.get(key) {
            Some(lock) if lock.is_expired(now) => {
                inner.locks.remove(key);
                None
            }
            Some(lock) => Some(lock.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl<C: Clock> Storage for MemoryBackend<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.inner.lock().kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.inner.lock().kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.inner.lock().kv.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .kv
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn get_all(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .kv
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        if inner.kv.contains_key(key) {
            return Ok(false);
        }
        inner.kv.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        if inner.kv.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        inner.kv.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn atomic_increment(&self, key: &str) -> Result<u64, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let current = inner
            .kv
            .get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        inner.kv.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn atomic_update(&self, key: &str, f: Transform<'_>) -> Result<String, StorageError> {
        validate_key(key)?;
        // The container mutex serializes the whole read-modify-write.
        let mut inner = self.inner.lock();
        let current = inner.kv.get(key).cloned();
        let next = f(current)?;
        inner.kv.insert(key.to_string(), next.clone());
        Ok(next)
    }

    async fn acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StorageError> {
        validate_key(key)?;
        let ttl = clamp_ttl(ttl_seconds);
        let now = self.clock.epoch_secs();
        let mut inner = self.inner.lock();

        match Self::live_lock(&mut inner, key, now) {
            Some(lock) if lock.owner != owner => Ok(false),
            existing => {
                let acquired_at = existing.map(|l| l.acquired_at).unwrap_or(now);
                inner.locks.insert(
                    key.to_string(),
                    LockInfo {
                        owner: owner.to_string(),
                        acquired_at,
                        expires_at: now + ttl,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let now = self.clock.epoch_secs();
        let mut inner = self.inner.lock();
        match Self::live_lock(&mut inner, key, now) {
            Some(lock) if lock.owner == owner => {
                inner.locks.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn extend_lock(
        &self,
        key: &str,
        ttl_seconds: i64,
        owner: &str,
    ) -> Result<bool, StorageError> {
        validate_key(key)?;
        let ttl = clamp_ttl(ttl_seconds);
        let now = self.clock.epoch_secs();
        let mut inner = self.inner.lock();
        match Self::live_lock(&mut inner, key, now) {
            Some(lock) if lock.owner == owner => {
                inner.locks.insert(
                    key.to_string(),
                    LockInfo {
                        owner: lock.owner,
                        acquired_at: lock.acquired_at,
                        expires_at: now + ttl,
                    },
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_locks(&self) -> Result<Vec<(String, LockInfo)>, StorageError> {
        let now = self.clock.epoch_secs();
        let inner = self.inner.lock();
        let mut locks: Vec<(String, LockInfo)> = inner
            .locks
            .iter()
            .filter(|(_, l)| !l.is_expired(now))
            .map(|(k, l)| (k.clone(), l.clone()))
            .collect();
        locks.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(locks)
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
