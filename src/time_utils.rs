// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and arithmetic.

use chrono::{DateTime, SecondsFormat, Utc};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Calendar month key ("YYYY-MM") for usage ledgers.
pub fn month_key(date: DateTime<Utc>) -> String {
    date.format("%Y-%m").to_string()
}

/// Whole days from `now` until `target`, rounded up.
///
/// Anything later today counts as one day; past instants give zero or less.
pub fn days_until(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    let millis = (target - now).num_milliseconds();
    let day_millis = SECONDS_PER_DAY * 1000;
    // Ceiling division that also holds for negative spans.
    let days = millis / day_millis;
    if millis % day_millis > 0 {
        days + 1
    } else {
        days
    }
}

/// Seconds from `now` until `target`, rounded up and never negative.
pub fn seconds_until(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    let millis = (target - now).num_milliseconds().max(0);
    (millis + 999) / 1000
}
