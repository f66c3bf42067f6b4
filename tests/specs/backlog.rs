//! Task backlog scenarios: single-agent lifecycle and CAS conflicts.

use crate::prelude::*;
use serde_json::json;

// Single task, single agent, version bumping on every mutation.
#[tokio::test]
async fn single_task_single_agent() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let added = call_ok(
        &ctx,
        "add_task",
        json!({ "agent_name": a, "title": "write docs", "priority": 3 }),
    )
    .await;
    assert_eq!(added["task"]["id"], "T1");
    assert_eq!(added["task"]["status"], "todo");
    assert_eq!(added["version"], 1);

    let claimed = call_ok(
        &ctx,
        "claim",
        json!({ "agent_name": a, "task_id": "T1", "expected_version": 1 }),
    )
    .await;
    assert_eq!(claimed["task"]["status"], "claimed");
    assert_eq!(claimed["task"]["assignee"], a);
    assert_eq!(claimed["version"], 2);

    let done = call_ok(
        &ctx,
        "done",
        json!({ "agent_name": a, "task_id": "T1", "notes": "ok" }),
    )
    .await;
    assert_eq!(done["task"]["status"], "done");
    assert_eq!(done["task"]["assignee"], a);
    assert_eq!(done["task"]["notes"], "ok");
    assert_eq!(done["version"], 3);

    // Audit trail: the join burned event seq 1, task_done is seq 2.
    let events = call_ok(&ctx, "get_events", json!({ "agent_name": a })).await;
    let events = events["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "agent_join");
    assert_eq!(events[1]["type"], "task_done");
    assert_eq!(events[1]["seq"], 2);
}

// Two agents race a claim after reading the same backlog version.
#[tokio::test]
async fn concurrent_claim_version_conflict() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    call_ok(&ctx, "add_task", json!({ "agent_name": a, "title": "t1" })).await;
    call_ok(&ctx, "add_task", json!({ "agent_name": a, "title": "t2" })).await;

    // Both agents observed version 2.
    let first = call_ok(
        &ctx,
        "claim",
        json!({ "agent_name": a, "task_id": "T2", "expected_version": 2 }),
    )
    .await;
    assert_eq!(first["version"], 3);

    let second = call(
        &ctx,
        "claim",
        json!({ "agent_name": b, "task_id": "T2", "expected_version": 2 }),
    )
    .await;
    assert!(second.is_error);
    assert!(second.text.contains("version conflict"));
    assert!(second.text.contains("expected 2"));
    assert!(second.text.contains("actual 3"));

    // The task stays with the winner.
    let tasks = call_ok(&ctx, "list_tasks", json!({ "agent_name": b })).await;
    let task = tasks["backlog"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == "T2")
        .unwrap()
        .clone();
    assert_eq!(task["assignee"], a);
}

#[tokio::test]
async fn cancel_done_task_is_invalid_state() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    call_ok(&ctx, "add_task", json!({ "agent_name": a, "title": "t" })).await;
    call_ok(&ctx, "claim", json!({ "agent_name": a, "task_id": "T1" })).await;
    call_ok(&ctx, "done", json!({ "agent_name": a, "task_id": "T1" })).await;

    let response = call(&ctx, "cancel", json!({ "agent_name": a, "task_id": "T1" })).await;
    assert!(response.is_error);
    assert!(response.text.contains("invalid state"));
}

#[tokio::test]
async fn claim_next_on_empty_backlog_fails() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let response = call(&ctx, "claim_next", json!({ "agent_name": a })).await;
    assert!(response.is_error);
    assert!(response.text.contains("task not found"));
}

#[tokio::test]
async fn release_returns_task_to_the_pool() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    call_ok(
        &ctx,
        "add_task",
        json!({ "agent_name": a, "title": "shared", "priority": 5 }),
    )
    .await;
    call_ok(&ctx, "claim_next", json!({ "agent_name": a })).await;
    call_ok(&ctx, "release", json!({ "agent_name": a, "task_id": "T1" })).await;

    let reclaimed = call_ok(&ctx, "claim_next", json!({ "agent_name": b })).await;
    assert_eq!(reclaimed["task"]["id"], "T1");
    assert_eq!(reclaimed["task"]["assignee"], b);
}
