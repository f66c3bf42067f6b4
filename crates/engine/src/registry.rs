// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry: join/leave, heartbeats, zombie sweep.

use masc_core::{
    agent::validate_agent_name, assign_nickname, Agent, AgentStatus, Clock, CoordError, EventType,
    SessionMeta,
};
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::{keys, Engine};

impl<C: Clock> Engine<C> {
    /// Join the room under `base` name.
    ///
    /// Assigns a stable nickname derived from the base name, appending a
    /// numeric suffix when another base already holds the derived name.
    /// Re-joining with the same base is idempotent and refreshes
    /// `last_seen`. Returns the persisted record and whether this was a
    /// rejoin.
    pub async fn join(
        &self,
        base: &str,
        agent_type: &str,
        session: Option<SessionMeta>,
    ) -> Result<(Agent, bool), CoordError> {
        validate_agent_name(base)?;
        self.room_state().await?;

        let now = self.clock.now_iso();
        let now_secs = self.clock.epoch_secs();

        // One registry scan feeds both the collision taken-set and the
        // lookup for a record this base already joined under.
        let mut taken = HashSet::new();
        let mut existing: Option<Agent> = None;
        for (key, raw) in self.store.get_all(keys::AGENTS_PREFIX).await? {
            let agent: Agent = crate::decode_doc(&key, &raw)?;
            if agent.requested_name == base {
                existing = Some(agent.clone());
            }
            taken.insert(agent.name);
        }

        if let Some(mut existing) = existing {
            let nickname = existing.name.clone();
            // A live holder with a different pid is a genuine name clash.
            let alive = !existing.is_zombie(now_secs, self.config.zombie_threshold_secs);
            let clashing_pid = match (&existing.session, &session) {
                (Some(a), Some(b)) => a.pid.is_some() && b.pid.is_some() && a.pid != b.pid,
                _ => false,
            };
            if alive && clashing_pid {
                return Err(CoordError::AgentAlreadyJoined(nickname));
            }

            existing.last_seen = now.clone();
            existing.status = AgentStatus::Active;
            if let Some(meta) = session {
                existing.session = Some(meta);
            }
            self.save_doc(&keys::agent(&nickname), &existing).await?;
            self.update_room_state(|state| {
                state.add_agent(&nickname);
                Ok(())
            })
            .await?;
            debug!(agent = %nickname, "agent rejoined");
            return Ok((existing, true));
        }

        let nickname = assign_nickname(base, &taken);
        let mut agent = Agent::new(nickname.clone(), agent_type, &now);
        agent.requested_name = base.to_string();
        agent.session = session.filter(|m| !m.is_empty());
        self.save_doc(&keys::agent(&nickname), &agent).await?;
        self.update_room_state(|state| {
            state.add_agent(&nickname);
            Ok(())
        })
        .await?;
        self.append_event(
            EventType::AgentJoin,
            &nickname,
            json!({ "agent_type": agent.agent_type }),
        )
        .await?;
        info!(agent = %nickname, "agent joined");
        Ok((agent, false))
    }

    /// Leave the room: drop the record, the active-set entry, and every
    /// lock the agent still holds.
    pub async fn leave(&self, name: &str) -> Result<(), CoordError> {
        let key = keys::agent(name);
        if !self.store.delete(&key).await? {
            return Err(CoordError::AgentNotFound(name.to_string()));
        }
        self.update_room_state(|state| {
            state.remove_agent(name);
            Ok(())
        })
        .await?;
        let released = self.locks.release_all_for(name).await?;
        self.append_event(
            EventType::AgentLeave,
            name,
            json!({ "released_locks": released }),
        )
        .await?;
        info!(agent = name, "agent left");
        Ok(())
    }

    /// Load one agent record.
    pub async fn agent(&self, name: &str) -> Result<Agent, CoordError> {
        self.load_doc::<Agent>(&keys::agent(name))
            .await?
            .ok_or_else(|| CoordError::AgentNotFound(name.to_string()))
    }

    /// Resolve a caller-supplied name to its record: exact nickname first,
    /// then the base name it joined under. Invalid names resolve to none.
    pub async fn resolve_agent(&self, name: &str) -> Result<Option<Agent>, CoordError> {
        if validate_agent_name(name).is_err() {
            return Ok(None);
        }
        if let Some(agent) = self.load_doc::<Agent>(&keys::agent(name)).await? {
            return Ok(Some(agent));
        }
        for (key, raw) in self.store.get_all(keys::AGENTS_PREFIX).await? {
            let agent: Agent = crate::decode_doc(&key, &raw)?;
            if agent.requested_name == name {
                return Ok(Some(agent));
            }
        }
        Ok(None)
    }

    /// Refresh `last_seen` in the persisted record.
    pub async fn heartbeat(&self, name: &str) -> Result<(), CoordError> {
        let key = keys::agent(name);
        let Some(mut agent) = self.load_doc::<Agent>(&key).await? else {
            return Err(CoordError::AgentNotFound(name.to_string()));
        };
        agent.last_seen = self.clock.now_iso();
        self.save_doc(&key, &agent).await
    }

    pub async fn set_agent_status(
        &self,
        name: &str,
        status: AgentStatus,
    ) -> Result<Agent, CoordError> {
        let key = keys::agent(name);
        let Some(mut agent) = self.load_doc::<Agent>(&key).await? else {
            return Err(CoordError::AgentNotFound(name.to_string()));
        };
        agent.status = status;
        agent.last_seen = self.clock.now_iso();
        self.save_doc(&key, &agent).await?;
        Ok(agent)
    }

    /// All live agent records, sorted by name. Sweeps zombies first.
    pub async fn list_agents(&self) -> Result<Vec<Agent>, CoordError> {
        self.sweep_zombies().await?;
        let mut agents = Vec::new();
        for (key, raw) in self.store.get_all(keys::AGENTS_PREFIX).await? {
            agents.push(crate::decode_doc::<Agent>(&key, &raw)?);
        }
        Ok(agents)
    }

    /// Remove agents whose `last_seen` is beyond the zombie threshold.
    ///
    /// Expired agents leave the active set, have their locks released, and
    /// get an `agent_leave` audit event. Returns the swept names.
    pub async fn sweep_zombies(&self) -> Result<Vec<String>, CoordError> {
        let now_secs = self.clock.epoch_secs();
        let threshold = self.config.zombie_threshold_secs;

        let mut swept = Vec::new();
        for (key, raw) in self.store.get_all(keys::AGENTS_PREFIX).await? {
            let agent: Agent = crate::decode_doc(&key, &raw)?;
            if agent.is_zombie(now_secs, threshold) {
                self.store.delete(&key).await?;
                swept.push(agent.name);
            }
        }

        if swept.is_empty() {
            return Ok(swept);
        }

        self.update_room_state(|state| {
            for name in &swept {
                state.remove_agent(name);
            }
            Ok(())
        })
        .await?;

        for name in &swept {
            let released = self.locks.release_all_for(name).await?;
            self.append_event(
                EventType::AgentLeave,
                name,
                json!({ "zombie": true, "released_locks": released }),
            )
            .await?;
            info!(agent = %name, "swept zombie agent");
        }
        Ok(swept)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
