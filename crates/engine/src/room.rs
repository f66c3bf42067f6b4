// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room lifecycle: init, reset, pause/resume, status.

use masc_core::{Clock, CoordError, EventType, RoomState};
use serde_json::json;
use tracing::info;

use crate::{keys, Engine};

impl<C: Clock> Engine<C> {
    /// Initialize the room. Fails with `AlreadyInitialized` when a state
    /// document exists.
    pub async fn init_room(&self) -> Result<RoomState, CoordError> {
        let state = RoomState::new(&self.clock.now_iso());
        let raw = crate::encode_doc(keys::STATE, &state)?;
        let created = self.store.set_if_absent(keys::STATE, &raw).await?;
        if !created {
            return Err(CoordError::AlreadyInitialized);
        }
        info!("room initialized");
        Ok(state)
    }

    /// Initialize the room if nobody has; never fails on an existing room.
    pub async fn ensure_room(&self) -> Result<RoomState, CoordError> {
        match self.init_room().await {
            Ok(state) => Ok(state),
            Err(CoordError::AlreadyInitialized) => self.room_state().await,
            Err(e) => Err(e),
        }
    }

    /// Load the room state. Fails with `NotInitialized` when absent.
    pub async fn room_state(&self) -> Result<RoomState, CoordError> {
        self.load_doc::<RoomState>(keys::STATE)
            .await?
            .ok_or(CoordError::NotInitialized)
    }

    /// Mutate the room state document under CAS.
    pub(crate) async fn update_room_state<R>(
        &self,
        apply: impl Fn(&mut RoomState) -> Result<R, CoordError>,
    ) -> Result<(RoomState, R), CoordError> {
        let now = self.clock.now_iso();
        self.update_doc(
            keys::STATE,
            || Err(CoordError::NotInitialized),
            |state: &mut RoomState| {
                let out = apply(state)?;
                state.last_updated = now.clone();
                Ok(out)
            },
        )
        .await
    }

    /// Pause the room: mutating tools are gated until resume.
    pub async fn pause(&self, by: &str, reason: Option<String>) -> Result<RoomState, CoordError> {
        let now = self.clock.now_iso();
        let (state, _) = self
            .update_room_state(|state| {
                state.paused = true;
                state.paused_by = Some(by.to_string());
                state.paused_at = Some(now.clone());
                state.pause_reason = reason.clone();
                Ok(())
            })
            .await?;
        self.append_event(
            EventType::RoomPause,
            by,
            json!({ "reason": state.pause_reason.clone() }),
        )
        .await?;
        Ok(state)
    }

    pub async fn resume(&self, by: &str) -> Result<RoomState, CoordError> {
        let (state, _) = self
            .update_room_state(|state| {
                state.paused = false;
                state.paused_by = None;
                state.paused_at = None;
                state.pause_reason = None;
                Ok(())
            })
            .await?;
        self.append_event(EventType::RoomResume, by, serde_json::Value::Null)
            .await?;
        Ok(state)
    }

    /// Admin reset: drop every room document and start fresh.
    ///
    /// Agents, backlog, counters, and state are recreated from zero;
    /// messages and events are left on disk for forensics.
    pub async fn reset_room(&self) -> Result<RoomState, CoordError> {
        for (key, _) in self.store.get_all(keys::AGENTS_PREFIX).await? {
            self.store.delete(&key).await?;
        }
        self.store.delete(keys::BACKLOG).await?;
        self.store.delete(keys::MESSAGE_SEQ).await?;
        self.store.delete(keys::EVENT_SEQ).await?;
        self.store.delete(keys::STATE).await?;
        info!("room reset");
        self.init_room().await
    }
}

#[cfg(test)]
#[path = "room_tests.rs"]
mod tests;
