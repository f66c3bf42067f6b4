// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock timestamp helpers.
//!
//! Persisted records carry ISO-8601 strings; comparisons go through
//! seconds-since-epoch so string formatting differences never matter.

use chrono::{DateTime, SecondsFormat, Utc};

/// Render seconds-since-epoch as an ISO-8601 (RFC 3339) UTC string.
pub fn iso_from_epoch_secs(secs: u64) -> String {
    DateTime::<Utc>::from_timestamp(secs as i64, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO-8601 string back to seconds-since-epoch.
///
/// Returns `None` for unparseable input or pre-epoch timestamps.
pub fn epoch_secs_from_iso(s: &str) -> Option<u64> {
    let parsed = DateTime::parse_from_rfc3339(s).ok()?;
    u64::try_from(parsed.timestamp()).ok()
}

/// The `(yyyy-mm, dd)` pair used to bucket audit-log containers by day.
pub fn month_day_buckets(secs: u64) -> (String, String) {
    let ts = DateTime::<Utc>::from_timestamp(secs as i64, 0).unwrap_or_default();
    (ts.format("%Y-%m").to_string(), ts.format("%d").to_string())
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
