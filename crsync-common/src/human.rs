//! Human-readable display formatting
//!
//! Consistent size and duration display across the crsync surface
//! (recording listings, status output).

/// Format a duration in milliseconds as `M:SS` (or `H:MM:SS` over an hour).
///
/// A zero or unknown duration renders as `0:00` rather than an error;
/// duration is display-only and never gates sync.
pub fn format_duration_millis(millis: u64) -> String {
    if millis == 0 {
        return "0:00".to_string();
    }

    let total_seconds = millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Format a byte count with a binary unit suffix (`B`, `KB`, `MB`, `GB`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exponent = (bytes as f64).log(1024.0).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    format!("{:.1} {}", value, UNITS[exponent])
}
