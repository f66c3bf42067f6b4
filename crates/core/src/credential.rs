// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stored credentials.
//!
//! The plaintext token is shown once at issuance; only the salted hash is
//! persisted. Hashing and verification live in the daemon's auth layer;
//! this is just the record.

use serde::{Deserialize, Serialize};

use crate::agent::AgentRole;
use crate::time::epoch_secs_from_iso;

/// Persisted credential for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub agent_name: String,
    /// Hex SHA-256 of `salt ‖ token`.
    pub token_hash: String,
    /// Hex-encoded per-credential random salt.
    pub salt: String,
    pub role: AgentRole,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl Credential {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        match &self.expires_at {
            Some(at) => epoch_secs_from_iso(at).is_some_and(|t| t <= now_secs),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
