// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered broadcast log.

use masc_core::{extract_mention, Clock, CoordError, EventType, Message, MessageType};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{keys, Engine};

/// Poll cadence for `wait_for_message`.
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(2);

impl<C: Clock> Engine<C> {
    /// Append a message to the ordered log and fan it out.
    ///
    /// Sequence allocation is authoritative; the room-state mirror and the
    /// pub/sub notification are both advisory.
    pub async fn broadcast(&self, from: &str, content: &str) -> Result<Message, CoordError> {
        self.send_message(from, content, MessageType::Broadcast, None)
            .await
    }

    pub(crate) async fn send_message(
        &self,
        from: &str,
        content: &str,
        kind: MessageType,
        forced_mention: Option<String>,
    ) -> Result<Message, CoordError> {
        let seq = self.seqs.next(keys::MESSAGE_SEQ).await;
        let message = Message {
            seq,
            from: from.to_string(),
            kind,
            content: content.to_string(),
            // Mentions are extracted once, at write time.
            mention: forced_mention.or_else(|| extract_mention(content)),
            timestamp: self.clock.now_iso(),
        };

        let key = keys::message(seq);
        self.save_doc(&key, &message).await?;

        if let Err(e) = self
            .update_room_state(|state| {
                state.message_seq = state.message_seq.max(seq);
                Ok(())
            })
            .await
        {
            warn!(seq, error = %e, "failed to mirror message_seq into room state");
        }

        self.append_event(
            EventType::Broadcast,
            from,
            json!({ "seq": seq, "mention": message.mention }),
        )
        .await?;

        self.notify_message(&message).await;
        debug!(seq, from, "message appended");
        Ok(message)
    }

    /// At most `limit` messages with `seq > since_seq`, ascending. When
    /// more than `limit` are pending, the newest window wins.
    ///
    /// Keys are scanned newest-first and the scan stops at `limit`, so
    /// work is bounded by the window being read, not the full log.
    pub async fn get_messages(
        &self,
        since_seq: u64,
        limit: usize,
    ) -> Result<Vec<Message>, CoordError> {
        let keys_list = self.store.list_keys(keys::MESSAGES_PREFIX).await?;

        let mut seqs: Vec<(u64, &String)> = keys_list
            .iter()
            .filter_map(|k| {
                k.strip_prefix(keys::MESSAGES_PREFIX)
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(|seq| (seq, k))
            })
            .collect();
        seqs.sort_by(|a, b| b.0.cmp(&a.0));

        let mut window = Vec::new();
        for (seq, key) in seqs {
            if seq <= since_seq || window.len() >= limit {
                break;
            }
            if let Some(message) = self.load_doc::<Message>(key).await? {
                window.push(message);
            }
        }

        // Readers tolerate gaps and sort by seq on ingestion.
        window.sort_by_key(|m| m.seq);
        Ok(window)
    }

    /// Block until a message addressed to `agent` arrives (direct, or a
    /// broadcast mentioning it), polling every ~2 s until `timeout`.
    ///
    /// Only messages with `seq > since_seq` count. Returns `None` on
    /// timeout.
    pub async fn wait_for_message(
        &self,
        agent: &str,
        since_seq: u64,
        timeout: Duration,
    ) -> Result<Option<Message>, CoordError> {
        let deadline = self.clock.now() + timeout;
        let mut cursor = since_seq;
        loop {
            for message in self.get_messages(cursor, 100).await? {
                cursor = cursor.max(message.seq);
                // Direct sends persist the target as the mention, so one
                // check covers both addressing forms.
                if message.mention.as_deref() == Some(agent) {
                    return Ok(Some(message));
                }
            }
            if self.clock.now() >= deadline {
                return Ok(None);
            }
            // External publishers may land between polls.
            let _ = self.store.subscribe(keys::MESSAGES_CHANNEL).await;
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(timeout)).await;
        }
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
