// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cell state for the mitosis handoff protocol.
//!
//! A cell represents the current process incarnation. Generations increase
//! by one at each division; the parent is marked dead once its successor is
//! spawned.

use serde::{Deserialize, Serialize};

/// Where the cell sits in its division lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellPhase {
    #[default]
    Infant,
    Mature,
    Preparing,
    Dividing,
}

/// Whether this incarnation is still the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Alive,
    Dead,
}

/// Per-process handoff state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub generation: u64,
    pub born_at: String,
    #[serde(default)]
    pub task_count: u64,
    #[serde(default)]
    pub tool_call_count: u64,
    #[serde(default)]
    pub phase: CellPhase,
    #[serde(default)]
    pub state: CellState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepared_dna: Option<String>,
}

impl Cell {
    pub fn new(generation: u64, now_iso: &str) -> Self {
        Self {
            generation,
            born_at: now_iso.to_string(),
            task_count: 0,
            tool_call_count: 0,
            phase: CellPhase::Infant,
            state: CellState::Alive,
            prepared_dna: None,
        }
    }

    /// Count one tool call; an infant cell matures on first activity.
    pub fn record_tool_call(&mut self) {
        self.tool_call_count += 1;
        if self.phase == CellPhase::Infant {
            self.phase = CellPhase::Mature;
        }
    }

    pub fn record_task(&mut self) {
        self.task_count += 1;
    }
}

#[cfg(test)]
#[path = "cell_tests.rs"]
mod tests;
