//! Call-log matching
//!
//! Links a locally discovered recording to the remote call-log entry it
//! most plausibly belongs to, using fuzzy phone-number comparison and a
//! fixed time window. Pure: candidates are fetched by the orchestrator,
//! this module only compares.

use chrono::NaiveDateTime;

use crate::models::RecordingFile;
use crate::services::remote_client::CallLogRecord;
use crsync_common::time::parse_wall_clock;

/// Matching window around the recording's capture time, in seconds
pub const MATCH_WINDOW_SECS: i64 = 120;

/// Find the best candidate call log for a recording.
///
/// Preconditions: the recording must carry both a parsed phone number and
/// a capture time; otherwise the answer is immediately `None`.
///
/// The phone test is deliberately permissive (last-10-digit suffix equality
/// OR substring containment in either direction, against the candidate's
/// phone number or customer id) to absorb country-code prefix variation.
/// Candidates that already carry a recording URL are excluded up front:
/// one call-log entry accepts at most one linked recording.
///
/// Among candidates inside the window the smallest absolute time delta
/// wins; equal deltas resolve to the first candidate in input order.
pub fn find_match<'a>(
    recording: &RecordingFile,
    candidates: &'a [CallLogRecord],
) -> Option<&'a CallLogRecord> {
    if recording.raw_phone_number.is_empty() {
        return None;
    }
    let captured_at = recording.captured_at?;

    let clean_phone = normalize_digits(&recording.raw_phone_number);

    let mut best: Option<(&CallLogRecord, i64)> = None;

    for candidate in candidates {
        if candidate.has_recording() {
            continue;
        }

        if !phone_matches(&clean_phone, candidate) {
            continue;
        }

        let delta = match time_delta_secs(captured_at, &candidate.start_time) {
            Some(delta) => delta,
            None => continue,
        };
        if delta > MATCH_WINDOW_SECS {
            continue;
        }

        // Strict comparison keeps the first candidate on equal deltas
        match best {
            Some((_, best_delta)) if delta >= best_delta => {}
            _ => best = Some((candidate, delta)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Strip everything but ASCII digits
fn normalize_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Last 10 digits of a normalized number (the whole string when shorter)
fn last_10(digits: &str) -> &str {
    &digits[digits.len().saturating_sub(10)..]
}

fn phone_matches(clean_phone: &str, candidate: &CallLogRecord) -> bool {
    let log_phone = normalize_digits(&candidate.phone_number);
    let customer_phone = normalize_digits(&candidate.customer_id);

    // Containment only counts between non-empty strings; an empty candidate
    // field carries no identifying information
    let contains_either = |a: &str, b: &str| {
        !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
    };

    (!log_phone.is_empty() && last_10(clean_phone) == last_10(&log_phone))
        || (!customer_phone.is_empty() && last_10(clean_phone) == last_10(&customer_phone))
        || contains_either(clean_phone, &log_phone)
        || contains_either(clean_phone, &customer_phone)
}

/// Absolute distance between capture time and a candidate's start time.
/// An unparseable start time fails the test for that candidate only.
fn time_delta_secs(captured_at: NaiveDateTime, start_time: &str) -> Option<i64> {
    let start = parse_wall_clock(start_time)?;
    Some((captured_at - start).num_seconds().abs())
}
