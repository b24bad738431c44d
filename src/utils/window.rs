// src/utils/window.rs

//! Quiz window arithmetic.
//!
//! A window is the half-open interval `[start, start + duration)`: the start
//! instant is inside, the end instant is not.

use chrono::{DateTime, Duration, Utc};

pub fn end_time(start: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
    start + Duration::minutes(i64::from(duration_minutes))
}

pub fn is_within_window(start: DateTime<Utc>, duration_minutes: i32, now: DateTime<Utc>) -> bool {
    start <= now && now < end_time(start, duration_minutes)
}

/// Signed seconds until the window closes. Negative once it has closed.
pub fn seconds_until_end(start: DateTime<Utc>, duration_minutes: i32, now: DateTime<Utc>) -> i64 {
    (end_time(start, duration_minutes) - now).num_seconds()
}

/// Signed seconds until the window opens, `None` once it has opened.
pub fn seconds_until_start(start: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    (now < start).then(|| (start - now).num_seconds())
}
