//! Recording directory scanner
//!
//! Enumerates one storage directory (non-recursive), filters to audio
//! files, and produces the ordered inventory the sync orchestrator works
//! from. Failure isolation is per file: an entry that cannot be read or
//! parsed is dropped with a warning and the scan continues.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::RecordingFile;
use crate::services::duration_probe::{build_identity_key, probe_duration};
use crate::services::filename_parser::{self, has_audio_extension};

/// Scanner errors (directory-level; per-file failures never surface here)
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Recording directory scanner
pub struct RecordingScanner;

impl RecordingScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan a directory for call recordings.
    ///
    /// Returns the inventory ordered newest-first by parsed capture time;
    /// files with no parsed timestamp keep their stable relative order at
    /// the end. The synced flag is a lookup against the supplied store
    /// snapshot; the scan itself never writes anywhere.
    pub fn scan(
        &self,
        dir: &Path,
        synced_keys: &HashSet<String>,
    ) -> Result<Vec<RecordingFile>, ScanError> {
        if !dir.exists() {
            return Err(ScanError::PathNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }

        let mut inventory = Vec::new();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Error accessing directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            if !has_audio_extension(&file_name) {
                continue;
            }

            match self.process_entry(entry.path(), file_name, synced_keys) {
                Some(file) => inventory.push(file),
                None => continue,
            }
        }

        // Stable sort: newest capture time first, undated entries last in
        // their original relative order
        inventory.sort_by_key(|f| Reverse(f.captured_at));

        tracing::debug!(
            count = inventory.len(),
            dir = %dir.display(),
            "Scan complete"
        );

        Ok(inventory)
    }

    /// Build one inventory item; any per-file failure returns `None`.
    fn process_entry(
        &self,
        path: &Path,
        file_name: String,
        synced_keys: &HashSet<String>,
    ) -> Option<RecordingFile> {
        let size_bytes = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "Skipping unreadable file");
                return None;
            }
        };

        let parsed = filename_parser::parse(&file_name);
        let duration_millis = probe_duration(path);
        let identity_key = build_identity_key(&file_name, size_bytes, &parsed.captured_at_raw);
        let synced = synced_keys.contains(&identity_key);

        Some(RecordingFile {
            file_name,
            path: path.to_path_buf(),
            raw_phone_number: parsed.raw_phone_number,
            display_phone_number: parsed.display_phone_number,
            display_date: parsed.display_date,
            display_time: parsed.display_time,
            call_type: parsed.call_type,
            captured_at: parsed.captured_at,
            captured_at_raw: parsed.captured_at_raw,
            size_bytes,
            duration_millis,
            identity_key,
            synced,
            matched_call_log_id: None,
        })
    }
}

impl Default for RecordingScanner {
    fn default() -> Self {
        Self::new()
    }
}
