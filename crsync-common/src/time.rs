//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a remote call-log start time.
///
/// The admin API emits local wall-clock times as `YYYY-MM-DD HH:MM:SS`;
/// some deployments use a `T` separator instead. No timezone conversion
/// is attempted.
pub fn parse_wall_clock(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
