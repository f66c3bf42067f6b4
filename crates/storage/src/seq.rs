// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence counter service.
//!
//! Wraps `atomic_increment` to produce globally unique, monotonic sequence
//! numbers. When the backend fails the service falls back to
//! `now_ms mod 10^6` so progress continues at the cost of a rare gap.

use masc_core::{Clock, SystemClock};
use std::sync::Arc;
use tracing::warn;

use crate::backend::Storage;

#[derive(Clone)]
pub struct SequenceService<C: Clock = SystemClock> {
    store: Arc<dyn Storage>,
    clock: C,
}

impl SequenceService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<C: Clock> SequenceService<C> {
    pub fn with_clock(store: Arc<dyn Storage>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Allocate the next value of the counter at `counter_key`.
    pub async fn next(&self, counter_key: &str) -> u64 {
        match self.store.atomic_increment(counter_key).await {
            Ok(n) => n,
            Err(e) => {
                let fallback = self.clock.epoch_ms() % 1_000_000;
                warn!(
                    counter = counter_key,
                    error = %e,
                    fallback,
                    "counter increment failed, using time-derived fallback",
                );
                fallback
            }
        }
    }

    /// Current value without incrementing (0 when unset).
    pub async fn peek(&self, counter_key: &str) -> u64 {
        match self.store.get(counter_key).await {
            Ok(Some(v)) => v.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

#[cfg(test)]
#[path = "seq_tests.rs"]
mod tests;
