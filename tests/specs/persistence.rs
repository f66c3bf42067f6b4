//! Filesystem room persistence: state survives a server restart.

use crate::prelude::*;
use masc_core::SystemClock;
use masc_daemon::env::{BackendKind, Config};
use masc_daemon::server::{build_ctx, build_storage};
use serde_json::json;

#[tokio::test]
async fn room_survives_restart() {
    let (ctx, dir) = fs_server().await;
    let a = join(&ctx, "a").await;

    call_ok(
        &ctx,
        "add_task",
        json!({ "agent_name": a, "title": "persisted", "priority": 2 }),
    )
    .await;
    call_ok(&ctx, "claim", json!({ "agent_name": a, "task_id": "T1" })).await;
    call_ok(
        &ctx,
        "broadcast",
        json!({ "agent_name": a, "content": "before restart" }),
    )
    .await;
    drop(ctx);

    // A fresh server over the same directory sees everything.
    let config = Config {
        backend: BackendKind::Filesystem,
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let store = build_storage(&config).await.unwrap();
    let revived = build_ctx(store, SystemClock, &config);
    revived.engine.ensure_room().await.unwrap();
    assert!(revived.sessions.restore().await.unwrap() >= 1);

    let tasks = call_ok(&revived, "list_tasks", json!({ "agent_name": a })).await;
    assert_eq!(tasks["backlog"]["version"], 2);
    assert_eq!(tasks["backlog"]["tasks"][0]["title"], "persisted");
    assert_eq!(tasks["backlog"]["tasks"][0]["assignee"], a);

    let messages = call_ok(
        &revived,
        "get_messages",
        json!({ "agent_name": a, "since_seq": 0 }),
    )
    .await;
    assert_eq!(messages["messages"][0]["content"], "before restart");

    // Sequence counters continue, never restart.
    let next = call_ok(
        &revived,
        "broadcast",
        json!({ "agent_name": a, "content": "after restart" }),
    )
    .await;
    assert_eq!(next["message"]["seq"], 2);
}

#[tokio::test]
async fn on_disk_layout_matches_the_room_contract() {
    let (ctx, dir) = fs_server().await;
    let a = join(&ctx, "a").await;
    call_ok(&ctx, "add_task", json!({ "agent_name": a, "title": "t" })).await;
    call_ok(
        &ctx,
        "broadcast",
        json!({ "agent_name": a, "content": "hello" }),
    )
    .await;
    call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": a, "key": "gate", "ttl_seconds": 60 }),
    )
    .await;

    let base = dir.path();
    assert!(base.join("state.json").exists());
    assert!(base.join("backlog.json").exists());
    assert!(base.join("agents").join(format!("{a}.json")).exists());
    assert!(base.join("messages").join("000001.json").exists());
    assert!(base.join("locks").join("gate.json").exists());
    assert!(base.join("locks").join("gate.flock").exists());
    assert!(base.join("sessions").join(format!("{a}.json")).exists());
    assert!(base.join("events").is_dir());
}

#[tokio::test]
async fn two_servers_share_one_room() {
    let (first, dir) = fs_server().await;
    let a = join(&first, "a").await;
    call_ok(
        &first,
        "add_task",
        json!({ "agent_name": a, "title": "shared", "priority": 1 }),
    )
    .await;

    // Second server process over the same directory.
    let config = Config {
        backend: BackendKind::Filesystem,
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let store = build_storage(&config).await.unwrap();
    let second = build_ctx(store, SystemClock, &config);
    second.engine.ensure_room().await.unwrap();
    let b = join(&second, "b").await;

    let claimed = call_ok(&second, "claim_next", json!({ "agent_name": b })).await;
    assert_eq!(claimed["task"]["id"], "T1");

    // The first server sees the claim.
    let tasks = call_ok(&first, "list_tasks", json!({ "agent_name": a })).await;
    assert_eq!(tasks["backlog"]["tasks"][0]["assignee"], b);
}
