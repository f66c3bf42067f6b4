// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window rate limiter.
//!
//! Windows are per (agent, category). Base limits scale by role and a
//! small per-agent burst budget absorbs short spikes. Rejections carry
//! `wait_seconds`: how long until the oldest recorded request rolls off
//! the window.

use masc_core::{AgentRole, Clock, CoordError, SystemClock};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Window width.
const WINDOW_MS: u64 = 60_000;

/// Per-agent burst budget on top of the scaled base limit.
const BURST: u32 = 5;

/// Tool category for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Broadcast,
    TaskOps,
    General,
}

impl Category {
    /// Base limit per minute, before role scaling.
    pub fn base_limit(&self) -> u32 {
        match self {
            Category::Broadcast => 15,
            Category::TaskOps => 30,
            Category::General => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Broadcast => "broadcast",
            Category::TaskOps => "task_ops",
            Category::General => "general",
        }
    }

    /// Category for a tool name.
    pub fn for_tool(tool: &str) -> Category {
        match tool {
            "broadcast" | "listen" | "portal_send" | "wait_for_message" => Category::Broadcast,
            "add_task" | "claim" | "claim_next" | "start" | "done" | "cancel" | "release"
            | "update_priority" | "gc_tasks" => Category::TaskOps,
            _ => Category::General,
        }
    }
}

pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    windows: Mutex<HashMap<(String, Category), VecDeque<u64>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request, or reject it with `RateLimitExceeded`.
    pub fn check(
        &self,
        agent: &str,
        role: AgentRole,
        category: Category,
    ) -> Result<(), CoordError> {
        let now = self.clock.epoch_ms();
        let limit =
            (category.base_limit() as f64 * role.limit_multiplier()).floor() as u32 + BURST;

        let mut windows = self.windows.lock();
        let window = windows
            .entry((agent.to_string(), category))
            .or_default();

        while let Some(oldest) = window.front() {
            if now.saturating_sub(*oldest) >= WINDOW_MS {
                window.pop_front();
            } else {
                break;
            }
        }

        let current = window.len() as u32;
        if current >= limit {
            // Seconds until the oldest recorded request rolls off.
            let oldest = window.front().copied().unwrap_or(now);
            let wait_ms = WINDOW_MS.saturating_sub(now.saturating_sub(oldest));
            let wait_seconds = (wait_ms.div_ceil(1000)).clamp(1, 60);
            return Err(CoordError::RateLimitExceeded {
                limit,
                current,
                wait_seconds,
                category: category.as_str().to_string(),
            });
        }

        window.push_back(now);
        Ok(())
    }

    /// Drop all recorded state for an agent (used when it leaves).
    pub fn forget(&self, agent: &str) {
        self.windows.lock().retain(|(name, _), _| name != agent);
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
