//! Recording filename parser
//!
//! Call recorders on Android handsets encode the peer number, capture time
//! and call direction into the filename, e.g.
//! `919812345678~_20240115143022_incoming.m4a`. Parsing is best-effort and
//! total: a name that matches nothing still yields a usable structure with
//! empty/default fields rather than an error.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::CallType;

/// Audio extensions recognized on recording files
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "wav", "amr", "3gp", "aac"];

/// Metadata parsed from one recording filename
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecording {
    /// Digits-only phone number; empty when the name starts with a non-digit
    pub raw_phone_number: String,
    /// Formatted number, or "Unknown" when no digits were found
    pub display_phone_number: String,
    pub call_type: CallType,
    /// Capture time, absent when no valid 14-digit timestamp is present
    pub captured_at: Option<NaiveDateTime>,
    /// Canonical `YYYY-MM-DD HH:MM:SS` string built from the 14-digit run,
    /// or empty. Built even when the calendar fields are invalid, because
    /// the identity key depends on it.
    pub captured_at_raw: String,
    /// Display date (`15 Jan 2024`), or "Unknown Date"
    pub display_date: String,
    /// Display 12-hour time (`02:30:22 PM`), or "Unknown Time"
    pub display_time: String,
}

/// Check whether a filename carries a recognized audio extension
pub fn has_audio_extension(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => AUDIO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// Parse identifying metadata out of a recording filename. Never fails.
pub fn parse(file_name: &str) -> ParsedRecording {
    let stem = strip_audio_extension(file_name);

    let raw_phone_number = leading_phone_digits(stem);
    let display_phone_number = if raw_phone_number.is_empty() {
        "Unknown".to_string()
    } else {
        format_phone_number(&raw_phone_number)
    };

    let timestamp_digits = find_timestamp_run(stem);
    let (captured_at, captured_at_raw) = match timestamp_digits {
        Some(ts) => (decompose_timestamp(ts), canonical_timestamp(ts)),
        None => (None, String::new()),
    };

    let (display_date, display_time) = match captured_at {
        Some(dt) => (display_date_of(dt), display_time_of(dt)),
        None => ("Unknown Date".to_string(), "Unknown Time".to_string()),
    };

    ParsedRecording {
        raw_phone_number,
        display_phone_number,
        call_type: classify_call_type(file_name),
        captured_at,
        captured_at_raw,
        display_date,
        display_time,
    }
}

/// Strip one trailing audio extension; some devices omit extensions, so a
/// name with none is returned whole.
fn strip_audio_extension(file_name: &str) -> &str {
    if let Some((stem, ext)) = file_name.rsplit_once('.') {
        if AUDIO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
        {
            return stem;
        }
    }
    file_name
}

/// Leading digit run, preferring the `<digits>~` delimiter convention.
///
/// The fallback (any leading digit run) covers recorders that drop the `~`;
/// both reduce to the same characters here, the delimiter only matters for
/// recorders that put other digits later in the name.
fn leading_phone_digits(stem: &str) -> String {
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
}

/// Find the first `_` immediately followed by 14 ASCII digits.
fn find_timestamp_run(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'_' && bytes.len() >= i + 15 {
            let run = &bytes[i + 1..i + 15];
            if run.iter().all(|c| c.is_ascii_digit()) {
                // Safe: a run of ASCII digits is valid UTF-8
                return Some(&stem[i + 1..i + 15]);
            }
        }
    }
    None
}

/// Decompose `YYYYMMDDHHMMSS` into a local date-time.
/// Out-of-range calendar fields yield `None`, not an error.
fn decompose_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let year: i32 = ts[0..4].parse().ok()?;
    let month: u32 = ts[4..6].parse().ok()?;
    let day: u32 = ts[6..8].parse().ok()?;
    let hour: u32 = ts[8..10].parse().ok()?;
    let minute: u32 = ts[10..12].parse().ok()?;
    let second: u32 = ts[12..14].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// `YYYYMMDDHHMMSS` → `YYYY-MM-DD HH:MM:SS`, built from the raw substrings
/// so it exists even for invalid calendar values.
fn canonical_timestamp(ts: &str) -> String {
    format!(
        "{}-{}-{} {}:{}:{}",
        &ts[0..4],
        &ts[4..6],
        &ts[6..8],
        &ts[8..10],
        &ts[10..12],
        &ts[12..14]
    )
}

/// Classify call direction by case-insensitive substring search over the
/// full filename, in precedence order.
fn classify_call_type(file_name: &str) -> CallType {
    let lower = file_name.to_lowercase();
    if lower.contains("incoming") || lower.contains("_in_") {
        CallType::Incoming
    } else if lower.contains("outgoing") || lower.contains("_out_") {
        CallType::Outgoing
    } else if lower.contains("missed") {
        CallType::Missed
    } else {
        CallType::RecordedCall
    }
}

fn display_date_of(dt: NaiveDateTime) -> String {
    dt.format("%-d %b %Y").to_string()
}

fn display_time_of(dt: NaiveDateTime) -> String {
    dt.format("%I:%M:%S %p").to_string()
}

/// Format a digits-only phone number for display.
///
/// Recognizes the `0091` international prefix and the bare `91` country code
/// on 12-digit numbers; plain 10-digit numbers get a single grouping space
/// after the fifth digit. Anything else passes through unchanged. The same
/// function is applied to recording numbers and call-log numbers so that
/// displayed values stay comparable.
pub fn format_phone_number(number: &str) -> String {
    if let Some(main) = number.strip_prefix("0091") {
        return if main.len() == 10 {
            format!("+91 {} {}", &main[0..5], &main[5..])
        } else {
            format!("+91 {}", main)
        };
    }

    if number.len() == 12 {
        if let Some(main) = number.strip_prefix("91") {
            return format!("+91 {} {}", &main[0..5], &main[5..]);
        }
    }

    if number.len() == 10 {
        return format!("{} {}", &number[0..5], &number[5..]);
    }

    number.to_string()
}
