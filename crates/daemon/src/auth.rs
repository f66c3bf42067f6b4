// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token authorization.
//!
//! Plaintext tokens are shown exactly once at issuance; only a salted
//! SHA-256 digest is persisted. Verification is constant-time. Roles form
//! a strict ladder: Reader may read and join/leave; Worker adds task,
//! messaging, portal, and lock actions; Admin adds room administration
//! and token issuance.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use masc_core::{AgentRole, Clock, CoordError, Credential, SystemClock};
use masc_engine::keys;
use masc_storage::Storage;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::info;

/// Minimum role required to call a tool.
pub fn required_role(tool: &str) -> AgentRole {
    match tool {
        // Read-only views plus presence management.
        "status" | "list_agents" | "list_tasks" | "get_messages" | "get_events"
        | "list_locks" | "list_portals" | "mitosis_status" | "join" | "leave" | "heartbeat"
        | "wait_for_message" => AgentRole::Reader,
        // Room administration and credential issuance.
        "init" | "reset" | "pause" | "resume" | "issue_token" | "revoke_token" => {
            AgentRole::Admin
        }
        // Everything else is a worker action.
        _ => AgentRole::Worker,
    }
}

pub struct AuthService<C: Clock = SystemClock> {
    store: Arc<dyn Storage>,
    clock: C,
    /// Require tokens even before any credential exists.
    required: bool,
}

impl<C: Clock> AuthService<C> {
    pub fn new(store: Arc<dyn Storage>, clock: C, required: bool) -> Self {
        Self {
            store,
            clock,
            required,
        }
    }

    /// Auth is enforced once configured on, or as soon as any credential
    /// has been issued.
    pub async fn enabled(&self) -> Result<bool, CoordError> {
        if self.required {
            return Ok(true);
        }
        Ok(!self.store.list_keys("auth:").await?.is_empty())
    }

    /// Issue a credential; returns the plaintext token exactly once.
    pub async fn issue(
        &self,
        agent: &str,
        role: AgentRole,
        ttl_seconds: Option<u64>,
    ) -> Result<String, CoordError> {
        let mut token_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut token_bytes);
        let token = URL_SAFE_NO_PAD.encode(token_bytes);

        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);

        let credential = Credential {
            agent_name: agent.to_string(),
            token_hash: hex::encode(hash_token(&salt, &token)),
            salt: hex::encode(salt),
            role,
            created_at: self.clock.now_iso(),
            expires_at: ttl_seconds
                .map(|ttl| masc_core::iso_from_epoch_secs(self.clock.epoch_secs() + ttl)),
        };

        let raw = serde_json::to_string(&credential)
            .map_err(|e| CoordError::Internal(e.to_string()))?;
        self.store.set(&keys::auth(agent), &raw).await?;
        info!(agent, role = role.as_str(), "credential issued");
        Ok(token)
    }

    /// Remove an agent's credential; returns whether one existed.
    pub async fn revoke(&self, agent: &str) -> Result<bool, CoordError> {
        let existed = self.store.delete(&keys::auth(agent)).await?;
        if existed {
            info!(agent, "credential revoked");
        }
        Ok(existed)
    }

    /// Resolve `(agent, token)` to the credential's role.
    pub async fn verify(&self, agent: &str, token: Option<&str>) -> Result<AgentRole, CoordError> {
        let Some(raw) = self.store.get(&keys::auth(agent)).await? else {
            return Err(CoordError::Unauthorized);
        };
        let credential: Credential =
            serde_json::from_str(&raw).map_err(|e| CoordError::Internal(e.to_string()))?;

        let Some(token) = token else {
            return Err(CoordError::Unauthorized);
        };
        let salt = hex::decode(&credential.salt).map_err(|_| CoordError::InvalidToken)?;
        let stored = hex::decode(&credential.token_hash).map_err(|_| CoordError::InvalidToken)?;
        let computed = hash_token(&salt, token);

        if stored.ct_eq(&computed).unwrap_u8() != 1 {
            return Err(CoordError::InvalidToken);
        }
        if credential.is_expired(self.clock.epoch_secs()) {
            return Err(CoordError::TokenExpired);
        }
        Ok(credential.role)
    }

    /// Full authorization check for one tool call.
    ///
    /// Skips entirely while auth is disabled (everyone acts as Worker,
    /// admin tools included, matching an unsecured room).
    pub async fn authorize(
        &self,
        agent: &str,
        token: Option<&str>,
        tool: &str,
    ) -> Result<AgentRole, CoordError> {
        if !self.enabled().await? {
            return Ok(AgentRole::Worker);
        }
        let role = self.verify(agent, token).await?;
        if role < required_role(tool) {
            return Err(CoordError::Forbidden {
                agent: agent.to_string(),
                action: tool.to_string(),
            });
        }
        Ok(role)
    }
}

fn hash_token(salt: &[u8], token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
