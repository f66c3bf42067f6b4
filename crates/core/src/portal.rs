// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portal records.
//!
//! A portal authorizes direct messaging between two agents. The stored
//! record is one-way; opening a portal creates its reverse counterpart so
//! both directions exist.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PortalStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    pub from: String,
    pub target: String,
    #[serde(default)]
    pub status: PortalStatus,
    pub opened_at: String,
    #[serde(default)]
    pub task_count: u64,
}

impl Portal {
    pub fn new(from: impl Into<String>, target: impl Into<String>, now_iso: &str) -> Self {
        Self {
            from: from.into(),
            target: target.into(),
            status: PortalStatus::Open,
            opened_at: now_iso.to_string(),
            task_count: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PortalStatus::Open
    }
}
