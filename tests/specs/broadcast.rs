//! Broadcast ordering scenarios.

use crate::prelude::*;
use serde_json::json;

// Three agents broadcast concurrently; the log stays strictly
// ordered with no duplicates.
#[tokio::test]
async fn concurrent_broadcast_ordering() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;
    let c = join(&ctx, "c").await;

    let (ra, rb, rc) = tokio::join!(
        call(&ctx, "broadcast", json!({ "agent_name": a, "content": "from a" })),
        call(&ctx, "broadcast", json!({ "agent_name": b, "content": "from b" })),
        call(&ctx, "broadcast", json!({ "agent_name": c, "content": "from c" })),
    );
    for r in [ra, rb, rc] {
        assert!(!r.is_error, "{}", r.text);
    }

    let read = call_ok(
        &ctx,
        "get_messages",
        json!({ "agent_name": a, "since_seq": 0, "limit": 100 }),
    )
    .await;
    let messages = read["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);

    let seqs: Vec<u64> = messages.iter().map(|m| m["seq"].as_u64().unwrap()).collect();
    let mut strictly_increasing = true;
    for pair in seqs.windows(2) {
        strictly_increasing &= pair[0] < pair[1];
    }
    assert!(strictly_increasing, "seqs out of order: {seqs:?}");
}

#[tokio::test]
async fn mentions_reach_waiting_agents() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    call_ok(
        &ctx,
        "broadcast",
        json!({ "agent_name": a, "content": format!("@{b} pick up T3") }),
    )
    .await;

    let found = call_ok(
        &ctx,
        "wait_for_message",
        json!({ "agent_name": b, "since_seq": 0, "timeout_seconds": 0 }),
    )
    .await;
    assert_eq!(found["timed_out"], false);
    assert_eq!(found["message"]["mention"], b);
}

#[tokio::test]
async fn listening_sessions_queue_broadcasts() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    call_ok(&ctx, "listen", json!({ "agent_name": b })).await;
    call_ok(
        &ctx,
        "broadcast",
        json!({ "agent_name": a, "content": "heads up" }),
    )
    .await;

    let drained = call_ok(&ctx, "listen", json!({ "agent_name": b })).await;
    let pending = drained["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["content"], "heads up");
}

#[tokio::test]
async fn portal_messages_flow_between_agents() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;
    let b = join(&ctx, "b").await;

    call_ok(&ctx, "open_portal", json!({ "agent_name": a, "target": b })).await;
    let sent = call_ok(
        &ctx,
        "portal_send",
        json!({ "agent_name": a, "target": b, "content": "direct line" }),
    )
    .await;
    assert_eq!(sent["message"]["type"], "direct");
    assert_eq!(sent["message"]["mention"], b);

    call_ok(&ctx, "close_portal", json!({ "agent_name": b, "target": a })).await;
    let rejected = call(
        &ctx,
        "portal_send",
        json!({ "agent_name": a, "target": b, "content": "too late" }),
    )
    .await;
    assert!(rejected.is_error);
}
