// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pub/sub notifier.
//!
//! Two delivery paths: the backend's pub/sub capability (when it has one)
//! and in-process subscriber callbacks registered on the engine. Callback
//! failures are isolated: one subscriber cannot block the others, and a
//! backend without pub/sub support downgrades to callbacks only.

use masc_core::{Clock, CoordError, Message};
use masc_storage::StorageError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::Engine;

/// In-process subscriber invoked once per broadcast.
pub type Subscriber = Box<dyn Fn(&Message) + Send + Sync>;

impl<C: Clock> Engine<C> {
    /// Register an in-process callback invoked for every new message.
    pub fn subscribe_messages(&self, subscriber: Subscriber) {
        self.subscribers.lock().push(subscriber);
    }

    /// Fan a message out to the backend channel and every callback.
    pub(crate) async fn notify_message(&self, message: &Message) {
        match serde_json::to_string(message) {
            Ok(payload) => {
                self.publish_external(crate::keys::MESSAGES_CHANNEL, &payload)
                    .await;
            }
            Err(e) => warn!(seq = message.seq, error = %e, "failed to encode message for pub/sub"),
        }

        let subscribers = self.subscribers.lock();
        for subscriber in subscribers.iter() {
            // A panicking subscriber must not take the rest down with it.
            if catch_unwind(AssertUnwindSafe(|| subscriber(message))).is_err() {
                warn!(seq = message.seq, "message subscriber panicked");
            }
        }
    }

    /// Publish on the backend channel; missing capability is not an error.
    pub(crate) async fn publish_external(&self, channel: &str, payload: &str) {
        match self.store.publish(channel, payload).await {
            Ok(delivered) => debug!(channel, delivered, "published"),
            Err(StorageError::NotSupported(_)) => {}
            Err(e) => warn!(channel, error = %e, "publish failed"),
        }
    }

    /// Dequeue one pending backend message for `channel`.
    pub async fn poll_channel(&self, channel: &str) -> Result<Option<String>, CoordError> {
        match self.store.subscribe(channel).await {
            Ok(message) => Ok(message),
            Err(StorageError::NotSupported(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
