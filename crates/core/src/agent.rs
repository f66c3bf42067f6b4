// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent records and roles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::CoordError;
use crate::time::epoch_secs_from_iso;

/// Authorization role for an agent.
///
/// Roles are strictly ordered: every Reader permission is a Worker
/// permission, every Worker permission is an Admin permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Reader,
    #[default]
    Worker,
    Admin,
}

impl AgentRole {
    /// Rate-limit multiplier applied to base per-category limits.
    pub fn limit_multiplier(&self) -> f64 {
        match self {
            AgentRole::Reader => 0.5,
            AgentRole::Worker => 1.0,
            AgentRole::Admin => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Reader => "reader",
            AgentRole::Worker => "worker",
            AgentRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for AgentRole {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, CoordError> {
        match s {
            "reader" => Ok(AgentRole::Reader),
            "worker" => Ok(AgentRole::Worker),
            "admin" => Ok(AgentRole::Admin),
            other => Err(CoordError::OperationFailed(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// Presence status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Busy,
    Listening,
    Inactive,
}

/// Optional process metadata recorded at join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
}

impl SessionMeta {
    pub fn is_empty(&self) -> bool {
        self.pid.is_none() && self.host.is_none() && self.tty.is_none() && self.worktree.is_none()
    }
}

/// A registered participant in the room.
///
/// `name` is the server-assigned nickname, not the raw requested name.
/// The requested name is kept so a rejoin under the same base resolves to
/// this record even when nickname collisions forced a numeric suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub requested_name: String,
    pub agent_type: String,
    #[serde(default)]
    pub role: AgentRole,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<String>,
    pub joined_at: String,
    pub last_seen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionMeta>,
}

impl Agent {
    pub fn new(name: impl Into<String>, agent_type: impl Into<String>, now_iso: &str) -> Self {
        let name = name.into();
        Self {
            requested_name: name.clone(),
            name,
            agent_type: agent_type.into(),
            role: AgentRole::default(),
            status: AgentStatus::Active,
            capabilities: BTreeSet::new(),
            joined_at: now_iso.to_string(),
            last_seen: now_iso.to_string(),
            session: None,
        }
    }

    /// Liveness check: an agent whose `last_seen` is older than the zombie
    /// threshold is treated as absent.
    pub fn is_zombie(&self, now_secs: u64, threshold_secs: u64) -> bool {
        match epoch_secs_from_iso(&self.last_seen) {
            Some(seen) => now_secs.saturating_sub(seen) > threshold_secs,
            // Unparseable last_seen reads as dead, so sweeps can reclaim it.
            None => true,
        }
    }
}

/// Validate a raw requested agent name.
///
/// Names feed into storage keys (`agents:<name>`), so the character rules
/// mirror key segments plus a length bound.
pub fn validate_agent_name(name: &str) -> Result<(), CoordError> {
    if name.is_empty() || name.len() > 64 {
        return Err(CoordError::InvalidAgentName(name.to_string()));
    }
    let ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !ok || name.starts_with('.') {
        return Err(CoordError::InvalidAgentName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
