// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn credential(expires_at: Option<&str>) -> Credential {
    Credential {
        agent_name: "ada".to_string(),
        token_hash: "ab".repeat(32),
        salt: "cd".repeat(16),
        role: AgentRole::Worker,
        created_at: "2026-08-01T00:00:00Z".to_string(),
        expires_at: expires_at.map(|s| s.to_string()),
    }
}

#[test]
fn no_expiry_never_expires() {
    assert!(!credential(None).is_expired(u64::MAX));
}

#[test]
fn expiry_boundary_is_inclusive() {
    let cred = credential(Some("2026-08-01T01:00:00Z"));
    let at = crate::time::epoch_secs_from_iso("2026-08-01T01:00:00Z").unwrap();
    assert!(!cred.is_expired(at - 1));
    assert!(cred.is_expired(at));
}

#[test]
fn serde_round_trip() {
    let cred = credential(Some("2026-09-01T00:00:00Z"));
    let json = serde_json::to_string(&cred).unwrap();
    let back: Credential = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cred);
}
