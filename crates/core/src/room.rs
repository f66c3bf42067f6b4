// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room state document.

use serde::{Deserialize, Serialize};

/// Coordination protocol version stamped into room state at init.
pub const PROTOCOL_VERSION: &str = "1";

fn default_mode() -> String {
    "normal".to_string()
}

/// The room's shared state document.
///
/// `message_seq` and `event_seq` are advisory mirrors of the counters; the
/// counters themselves are authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub protocol_version: String,
    pub started_at: String,
    pub last_updated: String,
    #[serde(default)]
    pub active_agents: Vec<String>,
    #[serde(default)]
    pub message_seq: u64,
    #[serde(default)]
    pub event_seq: u64,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
}

impl RoomState {
    pub fn new(now_iso: &str) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            started_at: now_iso.to_string(),
            last_updated: now_iso.to_string(),
            active_agents: Vec::new(),
            message_seq: 0,
            event_seq: 0,
            mode: default_mode(),
            paused: false,
            paused_by: None,
            paused_at: None,
            pause_reason: None,
        }
    }

    /// Add a name to the active set (idempotent).
    pub fn add_agent(&mut self, name: &str) {
        if !self.active_agents.iter().any(|a| a == name) {
            self.active_agents.push(name.to_string());
        }
    }

    /// Remove a name from the active set; returns whether it was present.
    pub fn remove_agent(&mut self, name: &str) -> bool {
        let before = self.active_agents.len();
        self.active_agents.retain(|a| a != name);
        self.active_agents.len() != before
    }
}

#[cfg(test)]
#[path = "room_tests.rs"]
mod tests;
