// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock manager.
//!
//! Thin façade over the backend lock primitives: clamps TTLs, retries once
//! on transient IO faults, and exposes owner-scoped release. Same-owner
//! re-acquire succeeds and extends the TTL (backend behavior); the manager
//! is not reentrant across different owner tokens.

use std::sync::Arc;
use tracing::warn;

use crate::backend::{LockInfo, Storage, StorageError};

#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn Storage>,
}

impl LockManager {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    pub async fn acquire(
        &self,
        key: &str,
        owner: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StorageError> {
        match self.store.acquire_lock(key, owner, ttl_seconds).await {
            Err(e) if e.is_transient() => {
                warn!(key, owner, error = %e, "lock acquire hit transient fault, retrying");
                self.store.acquire_lock(key, owner, ttl_seconds).await
            }
            other => other,
        }
    }

    /// Release is a warning, never a fault: missing or foreign-owned locks
    /// return `false`.
    pub async fn release(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        match self.store.release_lock(key, owner).await {
            Err(e) if e.is_transient() => {
                warn!(key, owner, error = %e, "lock release hit transient fault, retrying");
                self.store.release_lock(key, owner).await
            }
            other => other,
        }
    }

    pub async fn extend(
        &self,
        key: &str,
        ttl_seconds: i64,
        owner: &str,
    ) -> Result<bool, StorageError> {
        match self.store.extend_lock(key, ttl_seconds, owner).await {
            Err(e) if e.is_transient() => {
                warn!(key, owner, error = %e, "lock extend hit transient fault, retrying");
                self.store.extend_lock(key, ttl_seconds, owner).await
            }
            other => other,
        }
    }

    pub async fn list(&self) -> Result<Vec<(String, LockInfo)>, StorageError> {
        self.store.list_locks().await
    }

    /// Release every lock held by `owner`; returns the released keys.
    /// Used by the zombie sweep.
    pub async fn release_all_for(&self, owner: &str) -> Result<Vec<String>, StorageError> {
        let mut released = Vec::new();
        for (key, info) in self.store.list_locks().await? {
            if info.owner == owner && self.release(&key, owner).await? {
                released.push(key);
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
