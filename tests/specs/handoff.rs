//! Mitosis handoff scenarios.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn low_context_continues() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let out = call_ok(
        &ctx,
        "memento_mori",
        json!({ "agent_name": a, "context_ratio": 0.3 }),
    )
    .await;
    assert_eq!(out["status"], "continue");
}

#[tokio::test]
async fn mid_context_prepares_dna() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let out = call_ok(
        &ctx,
        "memento_mori",
        json!({ "agent_name": a, "context_ratio": 0.6, "full_context": "x" }),
    )
    .await;
    assert_eq!(out["status"], "prepared");
    assert_eq!(out["cell"]["phase"], "preparing");
    assert_eq!(out["cell"]["prepared_dna"], "x");
}

#[tokio::test]
async fn high_context_divides() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let before = call_ok(&ctx, "mitosis_status", json!({ "agent_name": a })).await;
    let generation = before["cell"]["generation"].as_u64().unwrap();

    let out = call_ok(
        &ctx,
        "memento_mori",
        json!({
            "agent_name": a,
            "context_ratio": 0.85,
            "full_context": "everything I know",
            "current_task": "finish the migration"
        }),
    )
    .await;
    assert_eq!(out["status"], "divided");
    assert_eq!(out["generation"].as_u64().unwrap(), generation + 1);
    assert_eq!(out["cell"]["state"], "alive");
    assert_eq!(out["cell"]["phase"], "infant");

    // The handover record is on disk for the external spawner.
    let raw = ctx
        .engine
        .store()
        .get(&format!("handovers:{}", generation + 1))
        .await
        .unwrap()
        .unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["dna"], "everything I know");
    assert!(record["prompt"]
        .as_str()
        .unwrap()
        .contains("finish the migration"));
}

#[tokio::test]
async fn out_of_range_ratio_is_rejected() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let response = call(
        &ctx,
        "memento_mori",
        json!({ "agent_name": a, "context_ratio": 1.5 }),
    )
    .await;
    assert!(response.is_error);
}
