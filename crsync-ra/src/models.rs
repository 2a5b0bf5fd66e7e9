//! Core data model for the recording agent

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Call direction classified from a recording filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    Incoming,
    Outgoing,
    Missed,
    /// Generic recording with no direction hint in the filename
    RecordedCall,
    /// Reserved for total parse failure
    Unknown,
}

impl CallType {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            CallType::Incoming => "Incoming",
            CallType::Outgoing => "Outgoing",
            CallType::Missed => "Missed",
            CallType::RecordedCall => "Recorded Call",
            CallType::Unknown => "Unknown",
        }
    }
}

/// One audio artifact discovered on-device.
///
/// Instances are owned by a single scan generation; a refresh produces a
/// fresh inventory rather than diffing against the previous one.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingFile {
    /// Raw filename, source of all parsed fields
    pub file_name: String,
    /// Filesystem location of the audio file
    pub path: PathBuf,
    /// Digits-only phone number parsed from the filename (may be empty)
    pub raw_phone_number: String,
    /// Formatted phone number for display
    pub display_phone_number: String,
    /// Display date (`15 Jan 2024`), or "Unknown Date"
    pub display_date: String,
    /// Display 12-hour time (`02:30:22 PM`), or "Unknown Time"
    pub display_time: String,
    pub call_type: CallType,
    /// Capture time parsed from the filename; absent when unparseable
    pub captured_at: Option<NaiveDateTime>,
    /// Canonical `YYYY-MM-DD HH:MM:SS` form of `captured_at`, or empty.
    /// Feeds the identity key, so its exact shape is load-bearing.
    pub captured_at_raw: String,
    pub size_bytes: u64,
    /// Declared audio duration; 0 when the probe failed
    pub duration_millis: u64,
    /// Stable identity across rescans: filename + size + raw timestamp
    pub identity_key: String,
    /// Whether the sync-state store already holds this identity key
    pub synced: bool,
    /// Call-log id the server linked this recording to, if any
    pub matched_call_log_id: Option<i64>,
}

/// Aggregate outcome of one orchestration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Unsynced files the run attempted to upload
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Uploads the server linked to a call-log entry
    pub matched: usize,
}

/// Inventory statistics for the status endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub total_bytes: u64,
    pub synced: usize,
    pub matched: usize,
}

impl ScanSummary {
    pub fn from_inventory(inventory: &[RecordingFile]) -> Self {
        Self {
            total: inventory.len(),
            total_bytes: inventory.iter().map(|f| f.size_bytes).sum(),
            synced: inventory.iter().filter(|f| f.synced).count(),
            matched: inventory
                .iter()
                .filter(|f| f.matched_call_log_id.is_some())
                .count(),
        }
    }
}
