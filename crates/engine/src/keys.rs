// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage key layout for the room.

/// Room state document.
pub const STATE: &str = "state";

/// The versioned task backlog.
pub const BACKLOG: &str = "backlog";

/// Archive container for garbage-collected tasks.
pub const BACKLOG_ARCHIVE: &str = "backlog:archive";

/// Message sequence counter.
pub const MESSAGE_SEQ: &str = "seq:message";

/// Audit event sequence counter.
pub const EVENT_SEQ: &str = "seq:event";

/// Prefix for message records.
pub const MESSAGES_PREFIX: &str = "messages:";

/// Prefix for agent records.
pub const AGENTS_PREFIX: &str = "agents:";

/// Pub/sub channel carrying new broadcast messages.
pub const MESSAGES_CHANNEL: &str = "messages";

/// Pub/sub channel carrying backlog changes.
pub const TASKS_CHANNEL: &str = "tasks";

pub fn agent(name: &str) -> String {
    format!("agents:{name}")
}

/// Message records are keyed by zero-padded sequence so lexicographic and
/// numeric order agree within the counter's range.
pub fn message(seq: u64) -> String {
    format!("messages:{seq:06}")
}

/// Day-bucketed audit log container.
pub fn events_day(month: &str, day: &str) -> String {
    format!("events:{month}:{day}")
}

pub fn session(agent: &str) -> String {
    format!("sessions:{agent}")
}

pub fn auth(agent: &str) -> String {
    format!("auth:{agent}")
}

pub fn portal(from: &str, target: &str) -> String {
    format!("portals:{from}:{target}")
}

pub fn mitosis(agent: &str) -> String {
    format!("mitosis:{agent}")
}

pub fn handover(generation: u64) -> String {
    format!("handovers:{generation}")
}
