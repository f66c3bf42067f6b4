//! Lock ownership scenarios.

use crate::prelude::*;
use serde_json::json;

// Lock ownership over the tool surface.
#[tokio::test]
async fn lock_ownership_lifecycle() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    let acquired = call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": a, "key": "file:foo.txt", "ttl_seconds": 60 }),
    )
    .await;
    assert_eq!(acquired["acquired"], true);

    let contended = call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": b, "key": "file:foo.txt", "ttl_seconds": 60 }),
    )
    .await;
    assert_eq!(contended["acquired"], false);

    let foreign_release = call_ok(
        &ctx,
        "release_lock",
        json!({ "agent_name": b, "key": "file:foo.txt" }),
    )
    .await;
    assert_eq!(foreign_release["released"], false);

    let release = call_ok(
        &ctx,
        "release_lock",
        json!({ "agent_name": a, "key": "file:foo.txt" }),
    )
    .await;
    assert_eq!(release["released"], true);

    let reacquired = call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": b, "key": "file:foo.txt", "ttl_seconds": 60 }),
    )
    .await;
    assert_eq!(reacquired["acquired"], true);
}

#[tokio::test]
async fn lock_events_land_in_the_audit_log() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": a, "key": "gate", "ttl_seconds": 60 }),
    )
    .await;
    call_ok(&ctx, "release_lock", json!({ "agent_name": a, "key": "gate" })).await;

    let events = call_ok(&ctx, "get_events", json!({ "agent_name": a })).await;
    let kinds: Vec<String> = events["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"lock_acquire".to_string()));
    assert!(kinds.contains(&"lock_release".to_string()));
}

#[tokio::test]
async fn list_locks_shows_owner_and_expiry() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": a, "key": "file:main.rs", "ttl_seconds": 120 }),
    )
    .await;

    let listing = call_ok(&ctx, "list_locks", json!({ "agent_name": a })).await;
    let locks = listing["locks"].as_array().unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0]["key"], "file:main.rs");
    assert_eq!(locks[0]["lock"]["owner"], a);
}

#[tokio::test]
async fn leave_releases_held_locks() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": a, "key": "gate", "ttl_seconds": 3600 }),
    )
    .await;
    call_ok(&ctx, "leave", json!({ "agent_name": a })).await;

    let acquired = call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": b, "key": "gate", "ttl_seconds": 60 }),
    )
    .await;
    assert_eq!(acquired["acquired"], true);
}
