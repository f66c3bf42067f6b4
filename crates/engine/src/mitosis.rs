// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mitosis: the context-exhaustion handoff controller.
//!
//! Two-phase protocol driven by the caller's `context_ratio`. At the
//! prepare threshold the controller distills the running context into a
//! compact DNA summary; at the handoff threshold it builds a successor
//! prompt from a stem-cell template, invokes the spawn hook, marks the
//! parent cell dead, and starts the next generation. Cell status persists
//! under `mitosis:<node>` so observers can read fleet health without a
//! tool call.

use masc_core::{Cell, CellPhase, CellState, Clock, CoordError, EventType, SystemClock};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::{keys, Engine};

/// Upper bound on the stored DNA summary, in bytes.
const DNA_MAX_LEN: usize = 2_000;

/// Pre-initialized successor prompt templates ("stem cells"). Placeholders:
/// `{generation}`, `{task}`, `{dna}`.
const STEM_POOL: &[&str] = &[
    "You are generation {generation} of a long-running worker. Your \
     predecessor ran out of context. Current task: {task}\n\nInherited \
     summary:\n{dna}\n\nContinue the work.",
    "Continuation handoff (generation {generation}). Task in flight: \
     {task}\n\nDNA from the previous incarnation:\n{dna}\n\nPick up where \
     it stopped.",
    "Fresh context, same mission. You are incarnation {generation}. \
     Task: {task}\n\nWhat your parent knew:\n{dna}",
];

/// Thresholds for the two phases, as context ratios in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct MitosisConfig {
    pub prepare_threshold: f64,
    pub handoff_threshold: f64,
}

impl Default for MitosisConfig {
    fn default() -> Self {
        Self {
            prepare_threshold: 0.5,
            handoff_threshold: 0.8,
        }
    }
}

/// Hook that launches the successor process with its prompt.
pub type SpawnFn = Box<dyn Fn(&str) -> Result<(), CoordError> + Send + Sync>;

/// What `memento_mori` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MitosisOutcome {
    /// Below the prepare threshold; nothing to do.
    Continue,
    /// DNA distilled and stored; cell is `Preparing`.
    Prepared,
    /// Successor spawned; the returned generation is the new cell's.
    Divided { generation: u64 },
}

/// Per-process handoff controller.
pub struct MitosisController<C: Clock = SystemClock> {
    engine: Arc<Engine<C>>,
    node: String,
    cell: Mutex<Cell>,
    config: MitosisConfig,
}

impl<C: Clock> MitosisController<C> {
    pub fn new(engine: Arc<Engine<C>>, node: impl Into<String>, config: MitosisConfig) -> Self {
        let born_at = engine.clock().now_iso();
        Self {
            engine,
            node: node.into(),
            cell: Mutex::new(Cell::new(1, &born_at)),
            config,
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell.lock().clone()
    }

    pub fn should_prepare(&self, context_ratio: f64) -> bool {
        context_ratio >= self.config.prepare_threshold
    }

    pub fn should_handoff(&self, context_ratio: f64) -> bool {
        context_ratio >= self.config.handoff_threshold
    }

    /// Count one tool call against the cell and persist its status.
    /// Invoked by the dispatch router on every call.
    pub async fn record_activity(&self) -> Result<(), CoordError> {
        {
            let mut cell = self.cell.lock();
            cell.record_tool_call();
        }
        self.persist().await
    }

    /// Count one task handled by this incarnation.
    pub async fn record_task(&self) -> Result<(), CoordError> {
        {
            let mut cell = self.cell.lock();
            cell.record_task();
        }
        self.persist().await
    }

    /// Distill `full_context` into DNA and move to `Preparing`.
    /// Idempotent once DNA is set.
    pub async fn prepare_for_division(&self, full_context: &str) -> Result<String, CoordError> {
        let dna = {
            let mut cell = self.cell.lock();
            if let Some(existing) = &cell.prepared_dna {
                existing.clone()
            } else {
                let dna = extract_dna(full_context);
                cell.prepared_dna = Some(dna.clone());
                cell.phase = CellPhase::Preparing;
                dna
            }
        };
        self.persist().await?;
        Ok(dna)
    }

    /// Divide: ensure DNA, build the successor prompt, invoke `spawn_fn`,
    /// kill the parent, and start generation + 1. Returns the dead parent
    /// and the successor cell.
    pub async fn execute_mitosis(
        &self,
        full_context: &str,
        current_task: &str,
        spawn_fn: &SpawnFn,
    ) -> Result<(Cell, Cell), CoordError> {
        let dna = self.prepare_for_division(full_context).await?;

        let (parent_generation, prompt) = {
            let mut cell = self.cell.lock();
            cell.phase = CellPhase::Dividing;
            let template = STEM_POOL[(cell.generation as usize) % STEM_POOL.len()];
            let prompt = template
                .replace("{generation}", &(cell.generation + 1).to_string())
                .replace("{task}", current_task)
                .replace("{dna}", &dna);
            (cell.generation, prompt)
        };
        self.persist().await?;

        // The spawn hook runs to completion within this call.
        spawn_fn(&prompt)?;

        let next_generation = parent_generation + 1;
        let handover = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "parent_generation": parent_generation,
            "generation": next_generation,
            "task": current_task,
            "dna": dna,
            "prompt": prompt,
            "created_at": self.engine.clock().now_iso(),
        });
        self.engine
            .save_doc(&keys::handover(next_generation), &handover)
            .await?;

        let born_at = self.engine.clock().now_iso();
        let parent = {
            let mut cell = self.cell.lock();
            cell.state = CellState::Dead;
            let parent = cell.clone();
            *cell = Cell::new(next_generation, &born_at);
            parent
        };
        self.persist().await?;

        self.engine
            .append_event(
                EventType::Mitosis,
                &self.node,
                json!({ "generation": next_generation }),
            )
            .await?;
        info!(node = %self.node, generation = next_generation, "cell divided");
        Ok((parent, self.cell()))
    }

    /// Check + prepare + handoff in one call, driven by `context_ratio`.
    pub async fn memento_mori(
        &self,
        context_ratio: f64,
        full_context: &str,
        current_task: &str,
        spawn_fn: &SpawnFn,
    ) -> Result<MitosisOutcome, CoordError> {
        if self.should_handoff(context_ratio) {
            let (_, successor) = self
                .execute_mitosis(full_context, current_task, spawn_fn)
                .await?;
            return Ok(MitosisOutcome::Divided {
                generation: successor.generation,
            });
        }
        if self.should_prepare(context_ratio) {
            self.prepare_for_division(full_context).await?;
            return Ok(MitosisOutcome::Prepared);
        }
        Ok(MitosisOutcome::Continue)
    }

    /// Write the current cell status under `mitosis:<node>`.
    pub async fn persist(&self) -> Result<(), CoordError> {
        let cell = self.cell();
        self.engine.save_doc(&keys::mitosis(&self.node), &cell).await
    }
}

/// Compress a full context into a bounded DNA summary: keep the head and
/// tail, drop the middle.
fn extract_dna(full_context: &str) -> String {
    let trimmed = full_context.trim();
    if trimmed.len() <= DNA_MAX_LEN {
        return trimmed.to_string();
    }
    let half = DNA_MAX_LEN / 2;
    let head_end = floor_char_boundary(trimmed, half);
    let tail_start = ceil_char_boundary(trimmed, trimmed.len() - half);
    format!(
        "{}\n[... {} bytes elided ...]\n{}",
        &trimmed[..head_end],
        tail_start - head_end,
        &trimmed[tail_start..]
    )
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
#[path = "mitosis_tests.rs"]
mod tests;
