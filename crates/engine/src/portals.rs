// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portals: stored authorization for direct agent-to-agent messaging.
//!
//! Opening a portal writes the forward record and its reverse counterpart,
//! so either side may send. Closing closes both directions.

use masc_core::{Clock, CoordError, EventType, Message, MessageType, Portal, PortalStatus};
use serde_json::json;
use tracing::info;

use crate::{keys, Engine};

impl<C: Clock> Engine<C> {
    /// Open a portal between `from` and `target` (both directions).
    pub async fn open_portal(&self, from: &str, target: &str) -> Result<Portal, CoordError> {
        // Both ends must exist before a portal can bind them.
        self.agent(from).await?;
        self.agent(target).await?;

        if let Some(existing) = self.load_doc::<Portal>(&keys::portal(from, target)).await? {
            if existing.is_open() {
                return Err(CoordError::PortalAlreadyOpen {
                    agent: from.to_string(),
                    target: target.to_string(),
                });
            }
        }

        let now = self.clock.now_iso();
        let forward = Portal::new(from, target, &now);
        let reverse = Portal::new(target, from, &now);
        self.save_doc(&keys::portal(from, target), &forward).await?;
        self.save_doc(&keys::portal(target, from), &reverse).await?;

        self.append_event(EventType::PortalOpen, from, json!({ "target": target }))
            .await?;
        info!(from, target, "portal opened");
        Ok(forward)
    }

    /// Close both directions of a portal.
    pub async fn close_portal(&self, from: &str, target: &str) -> Result<(), CoordError> {
        let key = keys::portal(from, target);
        let Some(mut portal) = self.load_doc::<Portal>(&key).await? else {
            return Err(CoordError::PortalNotOpen {
                from: from.to_string(),
                target: target.to_string(),
            });
        };
        if !portal.is_open() {
            return Err(CoordError::PortalClosed {
                from: from.to_string(),
                target: target.to_string(),
            });
        }

        portal.status = PortalStatus::Closed;
        self.save_doc(&key, &portal).await?;

        let reverse_key = keys::portal(target, from);
        if let Some(mut reverse) = self.load_doc::<Portal>(&reverse_key).await? {
            reverse.status = PortalStatus::Closed;
            self.save_doc(&reverse_key, &reverse).await?;
        }

        self.append_event(EventType::PortalClose, from, json!({ "target": target }))
            .await?;
        info!(from, target, "portal closed");
        Ok(())
    }

    /// Send a direct message through an open portal.
    pub async fn portal_send(
        &self,
        from: &str,
        target: &str,
        content: &str,
    ) -> Result<Message, CoordError> {
        let key = keys::portal(from, target);
        let portal = self
            .load_doc::<Portal>(&key)
            .await?
            .ok_or_else(|| CoordError::PortalNotOpen {
                from: from.to_string(),
                target: target.to_string(),
            })?;
        if !portal.is_open() {
            return Err(CoordError::PortalClosed {
                from: from.to_string(),
                target: target.to_string(),
            });
        }

        let message = self
            .send_message(from, content, MessageType::Direct, Some(target.to_string()))
            .await?;

        let mut updated = portal;
        updated.task_count += 1;
        self.save_doc(&key, &updated).await?;
        Ok(message)
    }

    /// All portal records, sorted by (from, target).
    pub async fn list_portals(&self) -> Result<Vec<Portal>, CoordError> {
        let mut portals = Vec::new();
        for (key, raw) in self.store.get_all("portals:").await? {
            portals.push(crate::decode_doc::<Portal>(&key, &raw)?);
        }
        Ok(portals)
    }
}

#[cfg(test)]
#[path = "portals_tests.rs"]
mod tests;
