// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_masc_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("MASC_") {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn defaults_without_env() {
    clear_masc_env();
    let config = Config::load().unwrap();
    assert_eq!(config.backend, BackendKind::Filesystem);
    assert_eq!(config.base_dir, PathBuf::from("./masc"));
    assert_eq!(config.cluster_name, "masc");
    assert_eq!(config.pubsub_max_messages, 1000);
    assert_eq!(config.http_port, None);
    assert!(!config.auth_required);
    assert_eq!(config.zombie_threshold_secs, 300);
}

#[test]
#[serial]
fn reads_backend_and_port() {
    clear_masc_env();
    std::env::set_var("MASC_BACKEND", "memory");
    std::env::set_var("MASC_HTTP_PORT", "7700");
    std::env::set_var("MASC_AUTH_REQUIRED", "1");
    std::env::set_var("MASC_ZOMBIE_THRESHOLD_SECS", "60");

    let config = Config::load().unwrap();
    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.http_port, Some(7700));
    assert!(config.auth_required);
    assert_eq!(config.zombie_threshold_secs, 60);
    clear_masc_env();
}

#[test]
#[serial]
fn unknown_backend_is_a_startup_error() {
    clear_masc_env();
    std::env::set_var("MASC_BACKEND", "redis");
    assert!(matches!(
        Config::load(),
        Err(ConfigError::UnknownBackend(_))
    ));
    clear_masc_env();
}

#[test]
#[serial]
fn sql_backend_requires_url() {
    clear_masc_env();
    std::env::set_var("MASC_BACKEND", "sql");
    assert!(matches!(
        Config::load(),
        Err(ConfigError::MissingPostgresUrl)
    ));

    std::env::set_var("MASC_POSTGRES_URL", "postgres://localhost/masc");
    let config = Config::load().unwrap();
    assert_eq!(config.backend, BackendKind::Sql);
    clear_masc_env();
}

#[test]
#[serial]
fn invalid_numbers_are_rejected() {
    clear_masc_env();
    std::env::set_var("MASC_HTTP_PORT", "not-a-port");
    assert!(matches!(
        Config::load(),
        Err(ConfigError::InvalidValue { .. })
    ));
    clear_masc_env();
}
