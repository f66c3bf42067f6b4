// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn iso_round_trip() {
    let secs = 1_722_470_400; // 2024-08-01T00:00:00Z
    let iso = iso_from_epoch_secs(secs);
    assert_eq!(iso, "2024-08-01T00:00:00Z");
    assert_eq!(epoch_secs_from_iso(&iso), Some(secs));
}

#[test]
fn parse_tolerates_offsets() {
    assert_eq!(
        epoch_secs_from_iso("2024-08-01T02:00:00+02:00"),
        Some(1_722_470_400)
    );
}

#[test]
fn parse_rejects_garbage() {
    assert_eq!(epoch_secs_from_iso("not a time"), None);
    assert_eq!(epoch_secs_from_iso(""), None);
}

#[test]
fn month_day_buckets_format() {
    let (month, day) = month_day_buckets(1_722_470_400);
    assert_eq!(month, "2024-08");
    assert_eq!(day, "01");
}
