// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At-rest encryption layer.
//!
//! Wraps any backend; values are AES-256-GCM encrypted before `set` and
//! decrypted after `get`. The stored form is base64 of
//! `[0x01][12-byte nonce][ciphertext]`; the one-byte version tag keeps a
//! mixed store readable: anything without a recognized tag passes through
//! as plaintext.
//!
//! The nonce is derived from `SHA-256(key ‖ plaintext)`, so encryption is
//! deterministic per (key, value). That keeps `compare_and_swap` working on
//! stored bytes: equal plaintexts produce equal ciphertexts. Counters are
//! exempt: `atomic_increment` needs numeric stored values and sequence
//! numbers are not secret.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use crate::backend::{LockInfo, Storage, StorageError, Transform};

/// Format version tag for encrypted values.
const VERSION_TAG: u8 = 0x01;

const NONCE_LEN: usize = 12;

/// A resolved 256-bit encryption key.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Derive a key from arbitrary material by hashing.
    pub fn from_material(material: &[u8]) -> Self {
        let digest = Sha256::digest(material);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self(key)
    }

    /// Read key material from a file.
    pub fn from_file(path: &Path) -> Result<Self, StorageError> {
        let material = std::fs::read(path)?;
        if material.is_empty() {
            return Err(StorageError::Encryption(format!(
                "empty key file: {}",
                path.display()
            )));
        }
        Ok(Self::from_material(&material))
    }

    /// Resolve from an environment value: a path to a key file when one
    /// exists at that path, otherwise the value itself is the material.
    pub fn resolve(value: &str) -> Result<Self, StorageError> {
        if value.is_empty() {
            return Err(StorageError::Encryption(
                "encryption enabled but key material is empty".to_string(),
            ));
        }
        let path = Path::new(value);
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::from_material(value.as_bytes()))
        }
    }
}

/// Storage wrapper applying at-rest encryption to values.
#[derive(Clone)]
pub struct EncryptedStorage {
    inner: Arc<dyn Storage>,
    cipher: Aes256Gcm,
}

impl EncryptedStorage {
    pub fn new(inner: Arc<dyn Storage>, key: &EncryptionKey) -> Result<Self, StorageError> {
        let cipher = Aes256Gcm::new_from_slice(&key.0)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;
        Ok(Self { inner, cipher })
    }

    fn encrypt(&self, key: &str, plaintext: &str) -> Result<String, StorageError> {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(plaintext.as_bytes());
        let digest = hasher.finalize();
        let nonce = Nonce::from_slice(&digest[..NONCE_LEN]);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        let mut bytes = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        bytes.push(VERSION_TAG);
        bytes.extend_from_slice(&digest[..NONCE_LEN]);
        bytes.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(bytes))
    }

    /// Decrypt a stored value; unrecognized formats pass through unchanged.
    fn decrypt(&self, stored: &str) -> Result<String, StorageError> {
        let Ok(bytes) = BASE64.decode(stored) else {
            return Ok(stored.to_string());
        };
        if bytes.first() != Some(&VERSION_TAG) || bytes.len() < 1 + NONCE_LEN {
            return Ok(stored.to_string());
        }
        let nonce = Nonce::from_slice(&bytes[1..1 + NONCE_LEN]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &bytes[1 + NONCE_LEN..])
            .map_err(|e| StorageError::Encryption(e.to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| StorageError::Encryption(format!("non-UTF8 plaintext: {e}")))
    }
}

#[async_trait]
impl Storage for EncryptedStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.inner.get(key).await? {
            Some(stored) => Ok(Some(self.decrypt(&stored)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let sealed = self.encrypt(key, value)?;
        self.inner.set(key, &sealed).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list_keys(prefix).await
    }

    async fn get_all(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let mut pairs = self.inner.get_all(prefix).await?;
        for (_, value) in pairs.iter_mut() {
            *value = self.decrypt(value)?;
        }
        Ok(pairs)
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        let sealed = self.encrypt(key, value)?;
        self.inner.set_if_absent(key, &sealed).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StorageError> {
        // Deterministic encryption: equality on sealed bytes is equality on
        // plaintexts, so the backend's CAS primitive still applies.
        let sealed_expected = match expected {
            Some(e) => Some(self.encrypt(key, e)?),
            None => None,
        };
        let sealed = self.encrypt(key, value)?;
        self.inner
            .compare_and_swap(key, sealed_expected.as_deref(), &sealed)
            .await
    }

    async fn atomic_increment(&self, key: &str) -> Result<u64, StorageError> {
        self.inner.atomic_increment(key).await
    }

    async fn atomic_update(&self, key: &str, f: Transform<'_>) -> Result<String, StorageError> {
        let wrapped = |current: Option<String>| -> Result<String, StorageError> {
            let plain = match current {
                Some(stored) => Some(self.decrypt(&stored)?),
                None => None,
            };
            let next = f(plain)?;
            self.encrypt(key, &next)
        };
        let sealed = self.inner.atomic_update(key, &wrapped).await?;
        self.decrypt(&sealed)
    }

    async fn acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StorageError> {
        self.inner.acquire_lock(key, owner, ttl_seconds).await
    }

    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        self.inner.release_lock(key, owner).await
    }

    async fn extend_lock(
        &self,
        key: &str,
        ttl_seconds: i64,
        owner: &str,
    ) -> Result<bool, StorageError> {
        self.inner.extend_lock(key, ttl_seconds, owner).await
    }

    async fn list_locks(&self) -> Result<Vec<(String, LockInfo)>, StorageError> {
        self.inner.list_locks().await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64, StorageError> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Option<String>, StorageError> {
        self.inner.subscribe(channel).await
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
#[path = "encryption_tests.rs"]
mod tests;
