//! Key validation scenarios over the storage boundary.

use crate::prelude::*;
use masc_core::validate_key;
use serde_json::json;

#[test]
fn validator_matrix() {
    assert!(validate_key("a/b").is_err());
    assert!(validate_key("a::b").is_err());
    assert!(validate_key("..").is_err());
    assert!(validate_key("users:42:name").is_ok());
}

#[tokio::test]
async fn invalid_lock_keys_surface_as_tool_errors() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    for bad in ["a/b", "a::b", "..", "task:*"] {
        let response = call(
            &ctx,
            "acquire_lock",
            json!({ "agent_name": a, "key": bad, "ttl_seconds": 60 }),
        )
        .await;
        assert!(response.is_error, "{bad:?} should be rejected");
        assert!(
            response.text.contains("invalid key"),
            "{bad:?} gave: {}",
            response.text
        );
    }
}

#[tokio::test]
async fn valid_keys_pass_through_unchanged() {
    let ctx = memory_server().await;
    let a = join(&ctx, "a").await;

    let acquired = call_ok(
        &ctx,
        "acquire_lock",
        json!({ "agent_name": a, "key": "users:42:name", "ttl_seconds": 60 }),
    )
    .await;
    assert_eq!(acquired["acquired"], true);
    assert_eq!(acquired["key"], "users:42:name");
}
