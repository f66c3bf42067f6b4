// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered room messages.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How a message is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Broadcast,
    Direct,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Broadcast => "broadcast",
            MessageType::Direct => "direct",
        }
    }
}

/// One entry in the ordered message log.
///
/// `seq` is globally monotonic per room. The mention is extracted once at
/// write time and persisted with the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub seq: u64,
    pub from: String,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
    pub timestamp: String,
}

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"@([A-Za-z0-9_-]+)") {
        Ok(re) => re,
        Err(_) => unreachable!("mention pattern is a valid regex"),
    })
}

/// First `@name` substring in `content`, if any.
pub fn extract_mention(content: &str) -> Option<String> {
    mention_re()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
