// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session registry with disk persistence.
//!
//! Per-agent session data lives in memory for fast access on every tool
//! call; register/unregister also persist a record under
//! `sessions:<agent>` so a restarted daemon can restore active sessions.

use masc_core::{Clock, CoordError, Message, SystemClock};
use masc_engine::keys;
use masc_storage::Storage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bound on queued messages per listening session.
const PENDING_MAX: usize = 256;

/// Persisted session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub agent: String,
    pub last_activity: String,
    #[serde(default)]
    pub listening: bool,
}

/// In-memory session state.
#[derive(Debug, Default)]
struct SessionData {
    last_activity: String,
    listening: bool,
    pending: VecDeque<Message>,
}

pub struct SessionRegistry<C: Clock = SystemClock> {
    store: Arc<dyn Storage>,
    clock: C,
    inner: Mutex<HashMap<String, SessionData>>,
}

impl<C: Clock> SessionRegistry<C> {
    pub fn new(store: Arc<dyn Storage>, clock: C) -> Self {
        Self {
            store,
            clock,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Restore sessions persisted by a previous run.
    pub async fn restore(&self) -> Result<usize, CoordError> {
        let mut restored = 0;
        for (key, raw) in self.store.get_all("sessions:").await? {
            match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) => {
                    self.inner.lock().insert(
                        record.agent.clone(),
                        SessionData {
                            last_activity: record.last_activity,
                            listening: record.listening,
                            pending: VecDeque::new(),
                        },
                    );
                    restored += 1;
                }
                Err(e) => warn!(key, error = %e, "skipping corrupt session record"),
            }
        }
        debug!(restored, "sessions restored");
        Ok(restored)
    }

    /// Register a session for `agent` and persist it.
    pub async fn register(&self, agent: &str) -> Result<(), CoordError> {
        let now = self.clock.now_iso();
        self.inner.lock().insert(
            agent.to_string(),
            SessionData {
                last_activity: now.clone(),
                listening: false,
                pending: VecDeque::new(),
            },
        );
        self.persist(agent, &now, false).await
    }

    /// Drop a session and its persisted record.
    pub async fn unregister(&self, agent: &str) -> Result<(), CoordError> {
        self.inner.lock().remove(agent);
        self.store.delete(&keys::session(agent)).await?;
        Ok(())
    }

    /// Refresh last-activity (in memory only; every tool call lands here).
    pub fn touch(&self, agent: &str) {
        let now = self.clock.now_iso();
        let mut inner = self.inner.lock();
        let data = inner.entry(agent.to_string()).or_default();
        data.last_activity = now;
    }

    pub fn is_registered(&self, agent: &str) -> bool {
        self.inner.lock().contains_key(agent)
    }

    /// The most recently active session, if any. Used to resolve an
    /// omitted `agent_name` argument.
    pub fn last_active(&self) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .iter()
            .max_by(|a, b| a.1.last_activity.cmp(&b.1.last_activity))
            .map(|(name, _)| name.clone())
    }

    /// Mark a session listening (or not) and persist the flag.
    pub async fn set_listening(&self, agent: &str, listening: bool) -> Result<(), CoordError> {
        let now = self.clock.now_iso();
        {
            let mut inner = self.inner.lock();
            let data = inner.entry(agent.to_string()).or_default();
            data.listening = listening;
            data.last_activity = now.clone();
        }
        self.persist(agent, &now, listening).await
    }

    /// Queue a message for every listening session except the sender's.
    pub fn fan_out(&self, message: &Message) {
        let mut inner = self.inner.lock();
        for (agent, data) in inner.iter_mut() {
            if !data.listening || *agent == message.from {
                continue;
            }
            if data.pending.len() >= PENDING_MAX {
                data.pending.pop_front();
            }
            data.pending.push_back(message.clone());
        }
    }

    /// Drain an agent's queued messages in arrival order.
    pub fn drain_pending(&self, agent: &str) -> Vec<Message> {
        let mut inner = self.inner.lock();
        match inner.get_mut(agent) {
            Some(data) => data.pending.drain(..).collect(),
            None => Vec::new(),
        }
    }

    async fn persist(&self, agent: &str, now: &str, listening: bool) -> Result<(), CoordError> {
        let record = SessionRecord {
            agent: agent.to_string(),
            last_activity: now.to_string(),
            listening,
        };
        let raw =
            serde_json::to_string(&record).map_err(|e| CoordError::Internal(e.to_string()))?;
        self.store.set(&keys::session(agent), &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
