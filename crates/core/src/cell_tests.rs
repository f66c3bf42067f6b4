// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_cell_is_infant_and_alive() {
    let cell = Cell::new(1, "2026-08-01T00:00:00Z");
    assert_eq!(cell.generation, 1);
    assert_eq!(cell.phase, CellPhase::Infant);
    assert_eq!(cell.state, CellState::Alive);
    assert_eq!(cell.prepared_dna, None);
}

#[test]
fn first_tool_call_matures_the_cell() {
    let mut cell = Cell::new(1, "2026-08-01T00:00:00Z");
    cell.record_tool_call();
    assert_eq!(cell.phase, CellPhase::Mature);
    assert_eq!(cell.tool_call_count, 1);

    cell.record_tool_call();
    assert_eq!(cell.tool_call_count, 2);
    assert_eq!(cell.phase, CellPhase::Mature);
}

#[test]
fn record_tool_call_preserves_later_phases() {
    let mut cell = Cell::new(1, "2026-08-01T00:00:00Z");
    cell.phase = CellPhase::Preparing;
    cell.record_tool_call();
    assert_eq!(cell.phase, CellPhase::Preparing);
}

#[test]
fn serde_round_trip() {
    let mut cell = Cell::new(3, "2026-08-01T00:00:00Z");
    cell.prepared_dna = Some("summary".to_string());
    cell.phase = CellPhase::Preparing;
    cell.task_count = 4;

    let json = serde_json::to_string(&cell).unwrap();
    let back: Cell = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cell);
}
