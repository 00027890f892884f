use crate::identity::types::Timestamp;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::time::Duration;

const SECONDS_PER_DAY: i64 = 86_400;

/// Parse an ISO-8601 / RFC 3339 timestamp as found in CloudTrail events
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .with_context(|| format!("Failed to parse timestamp: {}", ts))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a timestamp, keeping the original text alongside the instant
pub fn parse_event_time(ts: &str) -> Result<Timestamp> {
    Ok(Timestamp {
        raw: ts.to_string(),
        at: parse_timestamp(ts)?,
    })
}

/// Whole days elapsed from `from` to `now`, rounded down.
///
/// Rounds towards negative infinity, so a timestamp slightly in the future
/// counts as -1 days rather than 0.
pub fn days_since(from: &DateTime<Utc>, now: &DateTime<Utc>) -> i64 {
    now.signed_duration_since(*from)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// Generation stamp embedded in report filenames
pub fn filename_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H.%M.%S").to_string()
}

/// Elapsed wall-clock time as "N minutes and M seconds"
pub fn elapsed_human(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{} minutes and {} seconds", seconds / 60, seconds % 60)
}
