// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-engine: the coordination state engine.
//!
//! Owns the room state machine: agent registry with liveness, the
//! CAS-guarded task backlog, the ordered broadcast log, the audit event
//! log, portals, the pub/sub notifier, and the mitosis handoff controller.
//! All persistent state goes through the storage abstraction.

mod broadcast;
mod events;
pub mod keys;
mod mitosis;
mod notifier;
mod portals;
mod registry;
mod room;
mod tasks;

pub use mitosis::{MitosisConfig, MitosisController, MitosisOutcome, SpawnFn};
pub use notifier::Subscriber;
pub use tasks::NewTask;

use masc_core::{Clock, CoordError, SystemClock};
use masc_storage::{LockManager, SequenceService, Storage};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Attempts for the engine's get → decode → apply → CAS loop.
const UPDATE_ATTEMPTS: u32 = 5;

/// Back-off between CAS attempts.
const UPDATE_BACKOFF: Duration = Duration::from_millis(10);

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Agents unseen for longer than this are zombies.
    pub zombie_threshold_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zombie_threshold_secs: 300,
        }
    }
}

/// The coordination engine. One per room.
pub struct Engine<C: Clock = SystemClock> {
    store: Arc<dyn Storage>,
    locks: LockManager,
    seqs: SequenceService<C>,
    clock: C,
    config: EngineConfig,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Engine {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self::with_clock(store, SystemClock, EngineConfig::default())
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(store: Arc<dyn Storage>, clock: C, config: EngineConfig) -> Self {
        Self {
            locks: LockManager::new(Arc::clone(&store)),
            seqs: SequenceService::with_clock(Arc::clone(&store), clock.clone()),
            store,
            clock,
            config,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn health_check(&self) -> Result<bool, CoordError> {
        Ok(self.store.health_check().await?)
    }

    // -- document helpers --

    pub(crate) async fn load_doc<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CoordError> {
        match self.store.get(key).await.map_err(CoordError::from)? {
            Some(raw) => Ok(Some(decode_doc(key, &raw)?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn save_doc<T: Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CoordError> {
        let raw = encode_doc(key, value)?;
        Ok(self.store.set(key, &raw).await?)
    }

    /// Linearizable read-modify-write of one JSON document.
    ///
    /// `init` supplies the document when the key is absent; `apply` mutates
    /// it and may abort with a domain error (aborts are not retried, only
    /// CAS misses are). Returns the stored document and `apply`'s output.
    pub(crate) async fn update_doc<T, R>(
        &self,
        key: &str,
        init: impl Fn() -> Result<T, CoordError>,
        apply: impl Fn(&mut T) -> Result<R, CoordError>,
    ) -> Result<(T, R), CoordError>
    where
        T: Serialize + DeserializeOwned,
    {
        for attempt in 0..UPDATE_ATTEMPTS {
            let raw = self.store.get(key).await.map_err(CoordError::from)?;
            let mut doc: T = match &raw {
                Some(raw) => decode_doc(key, raw)?,
                None => init()?,
            };
            let out = apply(&mut doc)?;
            let encoded = encode_doc(key, &doc)?;
            if self
                .store
                .compare_and_swap(key, raw.as_deref(), &encoded)
                .await
                .map_err(CoordError::from)?
            {
                return Ok((doc, out));
            }
            if attempt + 1 < UPDATE_ATTEMPTS {
                tokio::time::sleep(UPDATE_BACKOFF).await;
            }
        }
        Err(CoordError::OperationFailed(format!(
            "concurrent update on {key} lost after {UPDATE_ATTEMPTS} attempts"
        )))
    }
}

pub(crate) fn decode_doc<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, CoordError> {
    serde_json::from_str(raw)
        .map_err(|e| CoordError::OperationFailed(format!("decode {key}: {e}")))
}

pub(crate) fn encode_doc<T: Serialize>(key: &str, value: &T) -> Result<String, CoordError> {
    serde_json::to_string(value)
        .map_err(|e| CoordError::OperationFailed(format!("encode {key}: {e}")))
}
