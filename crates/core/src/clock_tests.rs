// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn system_clock_advances() {
    let clock = SystemClock;
    let t1 = clock.now();
    let t2 = clock.now();
    assert!(t2 >= t1);
    assert!(clock.epoch_ms() > 0);
}

#[test]
fn fake_clock_advance() {
    let clock = FakeClock::new();
    let start_ms = clock.epoch_ms();
    let start = clock.now();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.epoch_ms(), start_ms + 90_000);
    assert_eq!(clock.now(), start + Duration::from_secs(90));
}

#[test]
fn epoch_secs_derived_from_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(12_345_678);
    assert_eq!(clock.epoch_secs(), 12_345);
}

#[test]
fn now_iso_round_trips_through_parse() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let iso = clock.now_iso();
    assert_eq!(
        crate::time::epoch_secs_from_iso(&iso),
        Some(1_700_000_000)
    );
}
