// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage contract shared by every backend.

use async_trait::async_trait;
use masc_core::{CoordError, KeyError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lock TTL bounds in seconds.
const TTL_MIN: u64 = 1;
const TTL_MAX: u64 = 86_400;

/// Attempts for the get → transform → CAS loop in [`Storage::atomic_update`].
const UPDATE_ATTEMPTS: u32 = 5;

/// Back-off between CAS attempts.
const UPDATE_BACKOFF: Duration = Duration::from_millis(10);

/// Clamp a requested lock TTL into `[1, 86400]` seconds.
pub fn clamp_ttl(ttl_seconds: i64) -> u64 {
    if ttl_seconds < TTL_MIN as i64 {
        TTL_MIN
    } else if ttl_seconds > TTL_MAX as i64 {
        TTL_MAX
    } else {
        ttl_seconds as u64
    }
}

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("backend does not support {0}")]
    NotSupported(&'static str),

    #[error("concurrent update lost on {key} after retries")]
    Conflict { key: String },

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("sql error: {0}")]
    Sql(String),
}

impl StorageError {
    /// True for faults that may clear on a single retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Io(_) | StorageError::Conflict { .. } | StorageError::Sql(_)
        )
    }
}

impl From<StorageError> for CoordError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidKey(k) => CoordError::InvalidKey(k.to_string()),
            StorageError::NotFound(k) => CoordError::KeyNotFound(k),
            StorageError::ConnectionFailed(m) => CoordError::ConnectionFailed(m),
            StorageError::NotSupported(what) => CoordError::BackendNotSupported(what.to_string()),
            other => CoordError::OperationFailed(other.to_string()),
        }
    }
}

/// Stored lock metadata. Timestamps are seconds since epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub owner: String,
    pub acquired_at: u64,
    pub expires_at: u64,
}

impl LockInfo {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        self.expires_at <= now_secs
    }
}

/// Read-modify-write transform passed to [`Storage::atomic_update`].
pub type Transform<'a> = &'a (dyn Fn(Option<String>) -> Result<String, StorageError> + Send + Sync);

/// Uniform key/value + lock + pub/sub contract.
///
/// Keys are validated on entry (`InvalidKey`); values are opaque strings.
/// `list_keys`/`get_all` return results sorted lexicographically by key.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Last-writer-wins write.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns whether the key was present.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn get_all(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError>;

    /// Returns true iff the insertion happened; atomic against concurrent
    /// writers.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError>;

    /// Returns true iff the current value equals `expected` and was
    /// replaced. `expected = None` means "key absent".
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StorageError>;

    /// Returns the new value. Counters initialize at 0, so the first
    /// increment returns 1.
    async fn atomic_increment(&self, key: &str) -> Result<u64, StorageError>;

    /// Serialized read-modify-write on one key.
    ///
    /// Default implementation: get → transform → compare-and-swap, retried
    /// with back-off; surfaces `Conflict` once attempts are exhausted.
    /// Returns the stored value.
    async fn atomic_update(&self, key: &str, f: Transform<'_>) -> Result<String, StorageError> {
        for attempt in 0..UPDATE_ATTEMPTS {
            let current = self.get(key).await?;
            let next = f(current.clone())?;
            if self
                .compare_and_swap(key, current.as_deref(), &next)
                .await?
            {
                return Ok(next);
            }
            if attempt + 1 < UPDATE_ATTEMPTS {
                tokio::time::sleep(UPDATE_BACKOFF).await;
            }
        }
        Err(StorageError::Conflict {
            key: key.to_string(),
        })
    }

    /// Acquire an owner-scoped lock. Expired locks are silently discarded;
    /// a same-owner re-acquire succeeds and extends the TTL.
    async fn acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StorageError>;

    /// Release a lock. Missing or foreign-owned locks return `false`.
    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError>;

    /// Extend a held lock's TTL from now. Returns `false` when the lock is
    /// missing, expired, or foreign-owned.
    async fn extend_lock(
        &self,
        key: &str,
        ttl_seconds: i64,
        owner: &str,
    ) -> Result<bool, StorageError>;

    /// Enumerate unexpired locks with their metadata, sorted by key.
    async fn list_locks(&self) -> Result<Vec<(String, LockInfo)>, StorageError>;

    /// Publish a message; the returned delivery count is advisory.
    async fn publish(&self, _channel: &str, _message: &str) -> Result<u64, StorageError> {
        Err(StorageError::NotSupported("pub/sub"))
    }

    /// Dequeue at most one pending message for the channel. Subscribers
    /// drive their own poll cadence.
    async fn subscribe(&self, _channel: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::NotSupported("pub/sub"))
    }

    async fn health_check(&self) -> Result<bool, StorageError>;
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
