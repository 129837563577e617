//! Human readable formatting helpers.

use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

const INTERVALS: &[(&str, u64)] = &[
    ("year", 365 * DAY),
    ("month", 30 * DAY),
    ("day", DAY),
    ("hour", HOUR),
    ("minute", MINUTE),
    ("second", 1),
];

/// Describe how long ago something happened, e.g. `"3 minutes ago"`.
///
/// Uses the largest whole unit; anything under a second is `"just now"`.
pub fn time_ago(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();

    for (label, unit) in INTERVALS {
        let count = seconds / unit;
        if count == 1 {
            return format!("1 {} ago", label);
        }
        if count > 1 {
            return format!("{} {}s ago", count, label);
        }
    }

    "just now".to_string()
}
