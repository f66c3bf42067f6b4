// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment configuration for the daemon.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown MASC_BACKEND {0:?} (expected memory, filesystem, or sql)")]
    UnknownBackend(String),

    #[error("MASC_BACKEND=sql requires MASC_POSTGRES_URL")]
    MissingPostgresUrl,

    #[error("invalid {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which storage backend to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Filesystem,
    Sql,
}

/// Daemon configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    /// Room base directory (filesystem backend).
    pub base_dir: PathBuf,
    /// Connection string for the SQL backend.
    pub postgres_url: Option<String>,
    /// Namespace under a shared database.
    pub cluster_name: String,
    /// At-rest encryption key material or key file path.
    pub encryption_key: Option<String>,
    /// Pub/sub retention per channel.
    pub pubsub_max_messages: u32,
    /// TCP port for the JSON-RPC listener; stdio only when unset.
    pub http_port: Option<u16>,
    /// Require tokens even before the first credential exists.
    pub auth_required: bool,
    /// Agents unseen for longer than this are swept.
    pub zombie_threshold_secs: u64,
    /// Recognized for external telemetry consumers; the core only logs it.
    pub telemetry_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Filesystem,
            base_dir: PathBuf::from("./masc"),
            postgres_url: None,
            cluster_name: "masc".to_string(),
            encryption_key: None,
            pubsub_max_messages: 1000,
            http_port: None,
            auth_required: false,
            zombie_threshold_secs: 300,
            telemetry_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from `MASC_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(backend) = non_empty("MASC_BACKEND") {
            config.backend = match backend.as_str() {
                "memory" => BackendKind::Memory,
                "filesystem" => BackendKind::Filesystem,
                "sql" => BackendKind::Sql,
                other => return Err(ConfigError::UnknownBackend(other.to_string())),
            };
        }

        if let Some(dir) = non_empty("MASC_BASE_DIR") {
            config.base_dir = PathBuf::from(dir);
        }
        config.postgres_url = non_empty("MASC_POSTGRES_URL");
        if let Some(cluster) = non_empty("MASC_CLUSTER_NAME") {
            config.cluster_name = cluster;
        }
        config.encryption_key = non_empty("MASC_ENCRYPTION_KEY");

        if let Some(raw) = non_empty("MASC_PUBSUB_MAX_MESSAGES") {
            config.pubsub_max_messages = parse(&raw, "MASC_PUBSUB_MAX_MESSAGES")?;
        }
        if let Some(raw) = non_empty("MASC_HTTP_PORT") {
            config.http_port = Some(parse(&raw, "MASC_HTTP_PORT")?);
        }
        if let Some(raw) = non_empty("MASC_AUTH_REQUIRED") {
            config.auth_required = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        if let Some(raw) = non_empty("MASC_ZOMBIE_THRESHOLD_SECS") {
            config.zombie_threshold_secs = parse(&raw, "MASC_ZOMBIE_THRESHOLD_SECS")?;
        }
        if let Some(raw) = non_empty("MASC_TELEMETRY_ENABLED") {
            config.telemetry_enabled = matches!(raw.as_str(), "1" | "true" | "yes");
        }

        if config.backend == BackendKind::Sql && config.postgres_url.is_none() {
            return Err(ConfigError::MissingPostgresUrl);
        }
        Ok(config)
    }
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(raw: &str, var: &'static str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
