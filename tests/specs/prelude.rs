//! Shared helpers for the behavioral specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use masc_core::SystemClock;
use masc_daemon::dispatch::{dispatch, ServerCtx, ToolResponse};
use masc_daemon::env::{BackendKind, Config};
use masc_daemon::server::{build_ctx, build_storage};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

/// A ready-to-serve server over a memory backend.
pub async fn memory_server() -> Arc<ServerCtx<SystemClock>> {
    let config = Config {
        backend: BackendKind::Memory,
        ..Config::default()
    };
    let store = build_storage(&config).await.unwrap();
    let ctx = build_ctx(store, SystemClock, &config);
    ctx.engine.ensure_room().await.unwrap();
    ctx
}

/// A ready-to-serve server over a filesystem room in a temp directory.
/// Keep the `TempDir` alive for the duration of the test.
pub async fn fs_server() -> (Arc<ServerCtx<SystemClock>>, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        backend: BackendKind::Filesystem,
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let store = build_storage(&config).await.unwrap();
    let ctx = build_ctx(store, SystemClock, &config);
    ctx.engine.ensure_room().await.unwrap();
    (ctx, dir)
}

/// Call a tool through the dispatcher and fail loudly on transport
/// errors; the response may still be a tool-level error.
pub async fn call(
    ctx: &ServerCtx<SystemClock>,
    tool: &str,
    args: Value,
) -> ToolResponse {
    dispatch(ctx, tool, &args).await
}

/// Call a tool, asserting success, and parse the JSON payload.
pub async fn call_ok(ctx: &ServerCtx<SystemClock>, tool: &str, args: Value) -> Value {
    let response = dispatch(ctx, tool, &args).await;
    assert!(
        !response.is_error,
        "tool {tool} failed: {}",
        response.text
    );
    serde_json::from_str(&response.text).unwrap()
}

/// Join an agent and return its nickname.
pub async fn join(ctx: &ServerCtx<SystemClock>, base: &str) -> String {
    let body = call_ok(
        ctx,
        "join",
        serde_json::json!({ "agent_name": base }),
    )
    .await;
    body["nickname"].as_str().unwrap().to_string()
}
