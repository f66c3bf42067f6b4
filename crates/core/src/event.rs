// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit events.

use serde::{Deserialize, Serialize};

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgentJoin,
    AgentLeave,
    Broadcast,
    TaskClaim,
    TaskStart,
    TaskDone,
    TaskCancel,
    TaskRelease,
    LockAcquire,
    LockRelease,
    RoomPause,
    RoomResume,
    PortalOpen,
    PortalClose,
    Mitosis,
}

/// One audit-log record.
///
/// `seq` is allocated from the event counter, independent of message
/// sequence numbers. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub agent: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    pub timestamp: String,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
