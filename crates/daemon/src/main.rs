// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MASC coordination daemon (mascd).
//!
//! Serves the coordination tool surface over JSON-RPC: stdio always, TCP
//! when `MASC_HTTP_PORT` is set. Exit code 0 on normal shutdown, nonzero
//! on unrecoverable startup failure.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use masc_core::SystemClock;
use masc_daemon::env::Config;
use masc_daemon::server;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("mascd {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return;
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: mascd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mascd: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let store = match server::build_storage(&config).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("mascd: backend startup failed: {e}");
            std::process::exit(1);
        }
    };

    let ctx = server::build_ctx(store, SystemClock, &config);

    if let Err(e) = ctx.engine.ensure_room().await {
        eprintln!("mascd: room initialization failed: {e}");
        std::process::exit(1);
    }
    match ctx.sessions.restore().await {
        Ok(restored) if restored > 0 => info!(restored, "restored sessions"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "session restore failed"),
    }

    if let Some(port) = config.http_port {
        let tcp_ctx = std::sync::Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = server::serve_tcp(tcp_ctx, port).await {
                error!(error = %e, "tcp listener failed");
            }
        });
    }

    if config.telemetry_enabled {
        info!("telemetry flag set; external collectors may attach");
    }
    info!(backend = ?config.backend, "mascd serving on stdio");

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("mascd: signal handler setup failed: {e}");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server::serve_stdio(ctx) => {
            if let Err(e) = result {
                error!(error = %e, "stdio loop failed");
                std::process::exit(1);
            }
            info!("stdin closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt, shutting down");
        }
        _ = sigterm.recv() => {
            info!("terminated, shutting down");
        }
    }
}

fn print_help() {
    println!("mascd {}", env!("CARGO_PKG_VERSION"));
    println!("MASC coordination server for fleets of autonomous agents");
    println!();
    println!("USAGE:");
    println!("    mascd");
    println!();
    println!("Speaks JSON-RPC 2.0 on stdio (Content-Length or newline framing,");
    println!("auto-detected) and on TCP when MASC_HTTP_PORT is set.");
    println!();
    println!("ENVIRONMENT:");
    println!("    MASC_BACKEND               memory | filesystem | sql");
    println!("    MASC_BASE_DIR              room directory (filesystem backend)");
    println!("    MASC_POSTGRES_URL          connection string (sql backend)");
    println!("    MASC_CLUSTER_NAME          namespace under a shared database");
    println!("    MASC_ENCRYPTION_KEY        at-rest encryption key or key file");
    println!("    MASC_PUBSUB_MAX_MESSAGES   retention per channel (default 1000)");
    println!("    MASC_HTTP_PORT             TCP port for the JSON-RPC listener");
    println!("    MASC_AUTH_REQUIRED         require tokens from the start");
    println!("    MASC_ZOMBIE_THRESHOLD_SECS liveness threshold (default 300)");
    println!("    MASC_TELEMETRY_ENABLED     recognized for external collectors");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}
