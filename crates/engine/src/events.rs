// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit event log.
//!
//! Events live in day-bucketed JSONL containers (`events:<yyyy-mm>:<dd>`),
//! one JSON record per line, appended under the storage layer's
//! serialized-update primitive. Sequence numbers come from their own
//! counter, independent of message sequence numbers.

use masc_core::time::month_day_buckets;
use masc_core::{Clock, CoordError, EventRecord, EventType};
use tracing::warn;

use crate::{keys, Engine};

/// Bound on how many day-buckets a read walks backwards from today.
const READ_WINDOW_DAYS: u64 = 366;

impl<C: Clock> Engine<C> {
    /// Append one audit record; returns its sequence number.
    pub async fn append_event(
        &self,
        kind: EventType,
        agent: &str,
        payload: serde_json::Value,
    ) -> Result<u64, CoordError> {
        let seq = self.seqs.next(keys::EVENT_SEQ).await;
        let record = EventRecord {
            seq,
            kind,
            agent: agent.to_string(),
            payload,
            timestamp: self.clock.now_iso(),
        };

        let (month, day) = month_day_buckets(self.clock.epoch_secs());
        let key = keys::events_day(&month, &day);
        let line = crate::encode_doc(&key, &record)?;

        self.store
            .atomic_update(&key, &move |current: Option<String>| {
                let mut body = current.unwrap_or_default();
                if !body.is_empty() && !body.ends_with('\n') {
                    body.push('\n');
                }
                body.push_str(&line);
                body.push('\n');
                Ok(body)
            })
            .await
            .map_err(CoordError::from)?;

        // The state mirror is advisory; the counter is authoritative.
        if let Err(e) = self
            .update_room_state(|state| {
                state.event_seq = state.event_seq.max(seq);
                Ok(())
            })
            .await
        {
            warn!(seq, error = %e, "failed to mirror event_seq into room state");
        }
        Ok(seq)
    }

    /// Read audit events with `seq > since_seq`, ascending, up to `limit`.
    ///
    /// Walks day buckets newest-first so `limit` bounds the work, then
    /// returns the window in ascending order.
    pub async fn get_events(
        &self,
        since_seq: u64,
        limit: usize,
    ) -> Result<Vec<EventRecord>, CoordError> {
        let today = self.clock.epoch_secs() / 86_400;
        let floor = self
            .room_state()
            .await
            .ok()
            .and_then(|s| masc_core::epoch_secs_from_iso(&s.started_at))
            .map(|secs| secs / 86_400)
            .unwrap_or(today)
            .clamp(today.saturating_sub(READ_WINDOW_DAYS), today);

        let mut events: Vec<EventRecord> = Vec::new();
        let mut day = today;
        loop {
            let (month, day_str) = month_day_buckets(day * 86_400);
            let key = keys::events_day(&month, &day_str);
            let mut saw_older = false;
            if let Some(body) = self.store.get(&key).await? {
                for line in body.lines().filter(|l| !l.trim().is_empty()) {
                    match serde_json::from_str::<EventRecord>(line) {
                        Ok(record) if record.seq > since_seq => events.push(record),
                        Ok(_) => saw_older = true,
                        Err(e) => warn!(key, error = %e, "skipping corrupt event line"),
                    }
                }
            }
            // Older buckets only hold smaller sequence numbers.
            if saw_older || day == floor {
                break;
            }
            day -= 1;
        }

        events.sort_by_key(|e| e.seq);
        events.truncate(limit);
        Ok(events)
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
