// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use masc_core::FakeClock;
use masc_storage::MemoryBackend;
use std::time::Duration;

fn service(required: bool) -> (AuthService<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let store: Arc<dyn Storage> = Arc::new(MemoryBackend::with_clock(clock.clone()));
    (AuthService::new(store, clock.clone(), required), clock)
}

#[yare::parameterized(
    status_read  = { "status", AgentRole::Reader },
    join_read    = { "join", AgentRole::Reader },
    claim_worker = { "claim", AgentRole::Worker },
    cast_worker  = { "broadcast", AgentRole::Worker },
    lock_worker  = { "acquire_lock", AgentRole::Worker },
    init_admin   = { "init", AgentRole::Admin },
    reset_admin  = { "reset", AgentRole::Admin },
    token_admin  = { "issue_token", AgentRole::Admin },
)]
fn permission_table(tool: &str, expected: AgentRole) {
    assert_eq!(required_role(tool), expected);
}

#[tokio::test]
async fn disabled_until_first_credential() {
    let (auth, _) = service(false);
    assert!(!auth.enabled().await.unwrap());

    auth.issue("ada", AgentRole::Worker, None).await.unwrap();
    assert!(auth.enabled().await.unwrap());
}

#[tokio::test]
async fn issue_then_verify_round_trip() {
    let (auth, _) = service(true);
    let token = auth.issue("ada", AgentRole::Worker, None).await.unwrap();

    let role = auth.verify("ada", Some(&token)).await.unwrap();
    assert_eq!(role, AgentRole::Worker);
}

#[tokio::test]
async fn plaintext_is_never_persisted() {
    let (auth, _) = service(true);
    let store: Arc<dyn Storage> = Arc::clone(&auth.store);
    let token = auth.issue("ada", AgentRole::Admin, None).await.unwrap();

    let raw = store.get("auth:ada").await.unwrap().unwrap();
    assert!(!raw.contains(&token));
}

#[tokio::test]
async fn wrong_token_is_invalid() {
    let (auth, _) = service(true);
    auth.issue("ada", AgentRole::Worker, None).await.unwrap();

    assert_eq!(
        auth.verify("ada", Some("nope")).await.unwrap_err(),
        CoordError::InvalidToken
    );
}

#[tokio::test]
async fn missing_credential_or_token_is_unauthorized() {
    let (auth, _) = service(true);
    assert_eq!(
        auth.verify("ghost", Some("x")).await.unwrap_err(),
        CoordError::Unauthorized
    );

    auth.issue("ada", AgentRole::Worker, None).await.unwrap();
    assert_eq!(
        auth.verify("ada", None).await.unwrap_err(),
        CoordError::Unauthorized
    );
}

#[tokio::test]
async fn expiry_is_honored() {
    let (auth, clock) = service(true);
    let token = auth
        .issue("ada", AgentRole::Worker, Some(3600))
        .await
        .unwrap();

    assert!(auth.verify("ada", Some(&token)).await.is_ok());
    clock.advance(Duration::from_secs(3601));
    assert_eq!(
        auth.verify("ada", Some(&token)).await.unwrap_err(),
        CoordError::TokenExpired
    );
}

#[tokio::test]
async fn insufficient_role_is_forbidden() {
    let (auth, _) = service(true);
    let token = auth.issue("r", AgentRole::Reader, None).await.unwrap();

    assert!(auth.authorize("r", Some(&token), "status").await.is_ok());
    assert_eq!(
        auth.authorize("r", Some(&token), "claim").await.unwrap_err(),
        CoordError::Forbidden {
            agent: "r".to_string(),
            action: "claim".to_string(),
        }
    );
}

#[tokio::test]
async fn authorize_is_a_no_op_while_disabled() {
    let (auth, _) = service(false);
    let role = auth.authorize("anyone", None, "reset").await.unwrap();
    assert_eq!(role, AgentRole::Worker);
}

#[tokio::test]
async fn revoke_removes_credential() {
    let (auth, _) = service(true);
    let token = auth.issue("ada", AgentRole::Worker, None).await.unwrap();

    assert!(auth.revoke("ada").await.unwrap());
    assert!(!auth.revoke("ada").await.unwrap());
    assert_eq!(
        auth.verify("ada", Some(&token)).await.unwrap_err(),
        CoordError::Unauthorized
    );
}
