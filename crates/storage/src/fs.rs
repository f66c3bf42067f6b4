// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem backend.
//!
//! Keys map to relative paths by replacing `:` with `/` under a base
//! directory, with a `.json` extension. Writes go through a temp file and
//! rename. Read-modify-write operations are bracketed by an advisory-lock
//! envelope: a process-local coordinator mutex (serializing threads in one
//! binary) wrapped around an OS-level `flock` on a `.flock` companion file
//! (serializing processes). The flock is taken non-blockingly; lock
//! operations report "not acquired" on contention instead of waiting.

use async_trait::async_trait;
use fs2::FileExt;
use masc_core::{validate_key, Clock, SystemClock};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::backend::{clamp_ttl, LockInfo, Storage, StorageError, Transform};

/// Attempts to enter the advisory-lock envelope for read-modify-write ops.
const ENVELOPE_ATTEMPTS: u32 = 5;

/// Pause between envelope attempts.
const ENVELOPE_BACKOFF: Duration = Duration::from_millis(10);

/// Filesystem-backed storage, safe across processes sharing one base dir.
#[derive(Clone)]
pub struct FsBackend<C: Clock = SystemClock> {
    base: PathBuf,
    coordinator: Arc<Mutex<()>>,
    clock: C,
}

impl FsBackend {
    pub fn new(base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::with_clock(base, SystemClock)
    }
}

impl<C: Clock> FsBackend<C> {
    pub fn with_clock(base: impl Into<PathBuf>, clock: C) -> Result<Self, StorageError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self {
            base,
            coordinator: Arc::new(Mutex::new(())),
            clock,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Map a validated key to a path below `root`, appending `.json` to the
    /// final segment. Appending (rather than replacing an extension) keeps
    /// dotted segments like `foo.txt` intact.
    fn map_key(root: &Path, key: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        let mut segments = key.split(':').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_some() {
                path.push(seg);
            } else {
                path.push(format!("{seg}.json"));
            }
        }
        path
    }

    /// Map a validated key to its data file path.
    fn data_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(Self::map_key(&self.base, key))
    }

    /// Map a lock key to its lock file path under `locks/`.
    fn lock_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(Self::map_key(&self.base.join("locks"), key))
    }

    fn flock_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = name.strip_suffix(".json").unwrap_or(name);
        path.with_file_name(format!("{stem}.flock"))
    }

    /// Atomic write: temp file in the same directory, then rename.
    fn write_atomic(path: &Path, value: &str) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!("{name}.tmp.{}", std::process::id()));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_opt(path: &Path) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Reading a directory as a key resolves to absent.
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `f` inside the advisory-lock envelope for `path`.
    ///
    /// Returns `None` when the OS lock is contended; callers decide
    /// whether to retry or report "not acquired".
    fn with_envelope<T>(
        &self,
        path: &Path,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<Option<T>, StorageError> {
        let _guard = self.coordinator.lock();
        let flock = Self::flock_path(path);
        if let Some(parent) = flock.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&flock)?;
        if file.try_lock_exclusive().is_err() {
            return Ok(None);
        }
        let out = f();
        if let Err(e) = FileExt::unlock(&file) {
            warn!(path = %flock.display(), error = %e, "failed to release file lock");
        }
        out.map(Some)
    }

    /// Envelope with retries, for read-modify-write operations that must
    /// eventually run rather than report contention.
    async fn with_envelope_retry<T>(
        &self,
        path: &Path,
        f: impl Fn() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        for attempt in 0..ENVELOPE_ATTEMPTS {
            if let Some(out) = self.with_envelope(path, &f)? {
                return Ok(out);
            }
            if attempt + 1 < ENVELOPE_ATTEMPTS {
                tokio::time::sleep(ENVELOPE_BACKOFF).await;
            }
        }
        Err(StorageError::Io(std::io::Error::new(
            ErrorKind::WouldBlock,
            format!("file lock contention on {}", path.display()),
        )))
    }

    /// Read a lock file; corrupted or empty JSON is treated as absent and
    /// removed, as are expired locks.
    fn read_lock(path: &Path, now: u64) -> Option<LockInfo> {
        let raw = Self::read_opt(path).ok().flatten()?;
        let lock: LockInfo = match serde_json::from_str(&raw) {
            Ok(l) => l,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "removing corrupt lock file");
                let _ = fs::remove_file(path);
                return None;
            }
        };
        if lock.is_expired(now) {
            let _ = fs::remove_file(path);
            return None;
        }
        Some(lock)
    }
}

#[async_trait]
impl<C: Clock> Storage for FsBackend<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.data_path(key)?;
        Self::read_opt(&path)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.data_path(key)?;
        Self::write_atomic(&path, value)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.data_path(key)?;
        let _ = fs::remove_file(Self::flock_path(&path));
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys matching `prefix` by file-name prefix within the natural parent
    /// directory of the mapped path. Not a subtree scan.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let (dir_key, name_prefix) = match prefix.rfind(':') {
            Some(pos) => (&prefix[..pos], &prefix[pos + 1..]),
            None => ("", prefix),
        };

        let mut dir = self.base.clone();
        for seg in dir_key.split(':').filter(|s| !s.is_empty()) {
            dir.push(seg);
        }

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if !stem.starts_with(name_prefix) {
                continue;
            }
            if dir_key.is_empty() {
                keys.push(stem.to_string());
            } else {
                keys.push(format!("{dir_key}:{stem}"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get_all(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let keys = self.list_keys(prefix).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(&key).await? {
                out.push((key, value));
            }
        }
        Ok(out)
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        let path = self.data_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // create_new gives exclusive-creation semantics from the OS.
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(value.as_bytes())?;
                file.sync_all()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StorageError> {
        let path = self.data_path(key)?;
        self.with_envelope_retry(&path, || {
            let current = Self::read_opt(&path)?;
            if current.as_deref() != expected {
                return Ok(false);
            }
            Self::write_atomic(&path, value)?;
            Ok(true)
        })
        .await
    }

    async fn atomic_increment(&self, key: &str) -> Result<u64, StorageError> {
        let path = self.data_path(key)?;
        self.with_envelope_retry(&path, || {
            let current = Self::read_opt(&path)?
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0);
            let next = current + 1;
            Self::write_atomic(&path, &next.to_string())?;
            Ok(next)
        })
        .await
    }

    async fn atomic_update(&self, key: &str, f: Transform<'_>) -> Result<String, StorageError> {
        let path = self.data_path(key)?;
        self.with_envelope_retry(&path, || {
            let current = Self::read_opt(&path)?;
            let next = f(current)?;
            Self::write_atomic(&path, &next)?;
            Ok(next)
        })
        .await
    }

    async fn acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StorageError> {
        let path = self.lock_path(key)?;
        let ttl = clamp_ttl(ttl_seconds);
        let now = self.clock.epoch_secs();
        let owner = owner.to_string();

        let acquired = self.with_envelope(&path, || {
            match Self::read_lock(&path, now) {
                Some(lock) if lock.owner != owner => Ok(false),
                existing => {
                    let info = LockInfo {
                        owner: owner.clone(),
                        acquired_at: existing.map(|l| l.acquired_at).unwrap_or(now),
                        expires_at: now + ttl,
                    };
                    Self::write_atomic(&path, &serde_json::to_string(&info)?)?;
                    Ok(true)
                }
            }
        })?;
        // Contention on the flock means someone else is mid-operation:
        // report "not acquired" rather than waiting.
        Ok(acquired.unwrap_or(false))
    }

    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        let path = self.lock_path(key)?;
        let now = self.clock.epoch_secs();
        let owner = owner.to_string();

        let released = self.with_envelope(&path, || match Self::read_lock(&path, now) {
            Some(lock) if lock.owner == owner => {
                fs::remove_file(&path)?;
                Ok(true)
            }
            Some(lock) => {
                warn!(key, owner = %owner, holder = %lock.owner, "release of foreign-owned lock");
                Ok(false)
            }
            None => Ok(false),
        })?;
        Ok(released.unwrap_or(false))
    }

    async fn extend_lock(
        &self,
        key: &str,
        ttl_seconds: i64,
        owner: &str,
    ) -> Result<bool, StorageError> {
        let path = self.lock_path(key)?;
        let ttl = clamp_ttl(ttl_seconds);
        let now = self.clock.epoch_secs();
        let owner = owner.to_string();

        let extended = self.with_envelope(&path, || match Self::read_lock(&path, now) {
            Some(lock) if lock.owner == owner => {
                let info = LockInfo {
                    owner: lock.owner,
                    acquired_at: lock.acquired_at,
                    expires_at: now + ttl,
                };
                Self::write_atomic(&path, &serde_json::to_string(&info)?)?;
                Ok(true)
            }
            _ => Ok(false),
        })?;
        Ok(extended.unwrap_or(false))
    }

    async fn list_locks(&self) -> Result<Vec<(String, LockInfo)>, StorageError> {
        let root = self.base.join("locks");
        let now = self.clock.epoch_secs();
        let mut locks = Vec::new();
        collect_locks(&root, &root, now, &mut locks)?;
        locks.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(locks)
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        let probe = self.base.join(".health");
        fs::write(&probe, b"ok")?;
        fs::remove_file(&probe)?;
        Ok(true)
    }
}

/// Walk the `locks/` subtree, reconstructing keys from relative paths.
fn collect_locks(
    root: &Path,
    dir: &Path,
    now: u64,
    out: &mut Vec<(String, LockInfo)>,
) -> Result<(), StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_locks(root, &path, now, out)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        let Some(lock) = FsBackend::<masc_core::SystemClock>::read_lock(&path, now) else {
            continue;
        };
        if let Ok(rel) = path.strip_prefix(root) {
            let mut segs: Vec<String> = rel
                .iter()
                .filter_map(|s| s.to_str())
                .map(|s| s.to_string())
                .collect();
            if let Some(last) = segs.last_mut() {
                if let Some(stem) = last.strip_suffix(".json") {
                    *last = stem.to_string();
                }
            }
            out.push((segs.join(":"), lock));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
