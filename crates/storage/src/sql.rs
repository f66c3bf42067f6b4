// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres backend.
//!
//! Two tables: `kv` (keyed values with optional expiry, doubling as lock
//! rows) and `pubsub` (a persistent message queue per channel). Every key
//! is namespaced with the cluster name at this boundary so multiple rooms
//! can share one database; callers never see the prefix.

use async_trait::async_trait;
use masc_core::validate_key;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, warn};

use crate::backend::{clamp_ttl, Storage, StorageError};

/// Connection pool size shared across all calls.
const POOL_SIZE: u32 = 10;

/// Postgres refuses NOTIFY payloads near 8000 bytes; stay under it.
const NOTIFY_PAYLOAD_MAX: usize = 7_900;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires_at TIMESTAMPTZ NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS pubsub (
        id BIGSERIAL PRIMARY KEY,
        channel TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv (expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_pubsub_channel_id ON pubsub (channel, id)",
    "CREATE INDEX IF NOT EXISTS idx_pubsub_created_at ON pubsub (created_at)",
];

/// Filter applied by every kv query so expired rows read as absent.
const LIVE: &str = "(expires_at IS NULL OR expires_at >= now())";

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Sql(e.to_string())
    }
}

fn namespaced(cluster: &str, key: &str) -> String {
    format!("{cluster}:{key}")
}

fn strip_namespace(cluster: &str, stored: &str) -> String {
    stored
        .strip_prefix(&format!("{cluster}:"))
        .unwrap_or(stored)
        .to_string()
}

/// Escape `%`, `_`, and `\` for a LIKE pattern.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Postgres-backed storage for cross-machine rooms.
#[derive(Clone)]
pub struct SqlBackend {
    pool: PgPool,
    cluster: String,
}

impl SqlBackend {
    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str, cluster: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(POOL_SIZE)
            .connect(url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&pool).await?;
        }

        Ok(Self {
            pool,
            cluster: cluster.to_string(),
        })
    }

    /// Prefix a key with the cluster namespace.
    fn namespaced(&self, key: &str) -> String {
        namespaced(&self.cluster, key)
    }

    /// Strip the cluster namespace from a stored key.
    fn strip(&self, stored: &str) -> String {
        strip_namespace(&self.cluster, stored)
    }

    fn lock_key(&self, key: &str) -> String {
        self.namespaced(&format!("lock:{key}"))
    }

    async fn fetch_value(&self, stored_key: &str) -> Result<Option<String>, StorageError> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT value FROM kv WHERE key = $1 AND {LIVE}"))
                .bind(stored_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn insert_if_absent(
        &self,
        stored_key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<bool, StorageError> {
        // Expired rows would otherwise shadow the insert.
        sqlx::query("DELETE FROM kv WHERE key = $1 AND expires_at IS NOT NULL AND expires_at < now()")
            .bind(stored_key)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query(
            "INSERT INTO kv (key, value, expires_at)
             VALUES ($1, $2, CASE WHEN $3::bigint IS NULL THEN NULL
                                  ELSE now() + make_interval(secs => $3::bigint) END)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(stored_key)
        .bind(value)
        .bind(ttl_seconds.map(|t| t as i64))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete pub/sub rows older than `days`.
    pub async fn cleanup_pubsub_older_than(&self, days: u32) -> Result<u64, StorageError> {
        let result =
            sqlx::query("DELETE FROM pubsub WHERE created_at < now() - make_interval(days => $1)")
                .bind(days as i32)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Keep at most `per_channel` most-recent rows per channel.
    pub async fn cleanup_pubsub_excess(&self, per_channel: u32) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "DELETE FROM pubsub p WHERE p.id NOT IN (
                 SELECT id FROM pubsub q
                 WHERE q.channel = p.channel
                 ORDER BY q.id DESC LIMIT $1
             )",
        )
        .bind(per_channel as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Storage for SqlBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        self.fetch_value(&self.namespaced(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, expires_at = NULL, updated_at = now()",
        )
        .bind(self.namespaced(key))
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let result = sqlx::query(&format!("DELETE FROM kv WHERE key = $1 AND {LIVE}"))
            .bind(self.namespaced(key))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let pattern = format!("{}%", escape_like(&self.namespaced(prefix)));
        let rows = sqlx::query(&format!(
            "SELECT key FROM kv WHERE key LIKE $1 AND {LIVE} ORDER BY key"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| self.strip(&r.get::<String, _>(0)))
            .collect())
    }

    async fn get_all(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let pattern = format!("{}%", escape_like(&self.namespaced(prefix)));
        let rows = sqlx::query(&format!(
            "SELECT key, value FROM kv WHERE key LIKE $1 AND {LIVE} ORDER BY key"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| (self.strip(&r.get::<String, _>(0)), r.get::<String, _>(1)))
            .collect())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        self.insert_if_absent(&self.namespaced(key), value, None)
            .await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StorageError> {
        validate_key(key)?;
        match expected {
            None => self.insert_if_absent(&self.namespaced(key), value, None).await,
            Some(expected) => {
                let result = sqlx::query(&format!(
                    "UPDATE kv SET value = $3, updated_at = now()
                     WHERE key = $1 AND value = $2 AND {LIVE}"
                ))
                .bind(self.namespaced(key))
                .bind(expected)
                .bind(value)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() == 1)
            }
        }
    }

    async fn atomic_increment(&self, key: &str) -> Result<u64, StorageError> {
        validate_key(key)?;
        let row = sqlx::query(
            "INSERT INTO kv (key, value) VALUES ($1, '1')
             ON CONFLICT (key) DO UPDATE
             SET value = ((kv.value)::bigint + 1)::text, updated_at = now()
             RETURNING value",
        )
        .bind(self.namespaced(key))
        .fetch_one(&self.pool)
        .await?;
        let value: String = row.get(0);
        value
            .parse::<u64>()
            .map_err(|_| StorageError::Sql(format!("counter {key} holds non-numeric {value:?}")))
    }

    async fn acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StorageError> {
        validate_key(key)?;
        let stored = self.lock_key(key);
        let ttl = clamp_ttl(ttl_seconds);

        // Housekeeping first, then insert-if-absent, then re-read to
        // confirm ownership (covers the same-owner re-acquire).
        let inserted = self.insert_if_absent(&stored, owner, Some(ttl)).await?;
        if inserted {
            return Ok(true);
        }

        let holder = self.fetch_value(&stored).await?;
        if holder.as_deref() == Some(owner) {
            sqlx::query(
                "UPDATE kv SET expires_at = now() + make_interval(secs => $2::bigint),
                               updated_at = now()
                 WHERE key = $1",
            )
            .bind(&stored)
            .bind(ttl as i64)
            .execute(&self.pool)
            .await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let result = sqlx::query(&format!(
            "DELETE FROM kv WHERE key = $1 AND value = $2 AND {LIVE}"
        ))
        .bind(self.lock_key(key))
        .bind(owner)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            warn!(key, owner, "release of missing or foreign-owned lock");
            return Ok(false);
        }
        Ok(true)
    }

    async fn extend_lock(
        &self,
        key: &str,
        ttl_seconds: i64,
        owner: &str,
    ) -> Result<bool, StorageError> {
        validate_key(key)?;
        let ttl = clamp_ttl(ttl_seconds);
        let result = sqlx::query(&format!(
            "UPDATE kv SET expires_at = now() + make_interval(secs => $3::bigint),
                           updated_at = now()
             WHERE key = $1 AND value = $2 AND {LIVE}"
        ))
        .bind(self.lock_key(key))
        .bind(owner)
        .bind(ttl as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64, StorageError> {
        let channel = self.namespaced(channel);
        sqlx::query("INSERT INTO pubsub (channel, message) VALUES ($1, $2)")
            .bind(&channel)
            .bind(message)
            .execute(&self.pool)
            .await?;

        // Best-effort wakeup; the row persists either way and pollers will
        // find it.
        if message.len() <= NOTIFY_PAYLOAD_MAX {
            if let Err(e) = sqlx::query("SELECT pg_notify($1, $2)")
                .bind(&channel)
                .bind(message)
                .execute(&self.pool)
                .await
            {
                debug!(channel, error = %e, "pg_notify failed; subscribers will poll");
            }
        }
        Ok(1)
    }

    async fn subscribe(&self, channel: &str) -> Result<Option<String>, StorageError> {
        // Single-consumer-per-poll: concurrent consumers skip each other's
        // locked row and dequeue different messages.
        let row: Option<PgRow> = sqlx::query(
            "DELETE FROM pubsub WHERE id = (
                 SELECT id FROM pubsub WHERE channel = $1
                 ORDER BY id LIMIT 1
                 FOR UPDATE SKIP LOCKED
             ) RETURNING message",
        )
        .bind(self.namespaced(channel))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn list_locks(&self) -> Result<Vec<(String, crate::backend::LockInfo)>, StorageError> {
        let prefix = self.namespaced("lock:");
        let pattern = format!("{}%", escape_like(&prefix));
        let rows = sqlx::query(&format!(
            "SELECT key, value,
                    floor(extract(epoch FROM created_at))::bigint,
                    floor(extract(epoch FROM expires_at))::bigint
             FROM kv WHERE key LIKE $1 AND {LIVE} ORDER BY key"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let stored: String = r.get(0);
                let key = self
                    .strip(&stored)
                    .strip_prefix("lock:")
                    .unwrap_or_default()
                    .to_string();
                let info = crate::backend::LockInfo {
                    owner: r.get::<String, _>(1),
                    acquired_at: r.get::<i64, _>(2) as u64,
                    expires_at: r.get::<Option<i64>, _>(3).unwrap_or(0) as u64,
                };
                (key, info)
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "sql_tests.rs"]
mod tests;
