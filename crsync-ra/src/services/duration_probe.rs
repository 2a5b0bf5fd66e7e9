//! Audio duration probing and recording identity
//!
//! The probe opens the container just far enough to read its declared
//! duration, then releases the handle. Duration is advisory: matching and
//! sync proceed without it, so every probe failure degrades to zero.

use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;

/// Read the declared audio duration in milliseconds; 0 on any failure.
pub fn probe_duration(path: &Path) -> u64 {
    let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Duration probe failed");
            return 0;
        }
    };

    tagged_file.properties().duration().as_millis() as u64
}

/// Build the stable per-file identity key.
///
/// Pure and total: filename, byte size, and the raw parsed timestamp string
/// (possibly empty), underscore-joined. Identity is content-derived, not
/// filesystem-derived: a copy of the same recording with a fresh mtime
/// collides with the original.
pub fn build_identity_key(file_name: &str, size_bytes: u64, captured_at_raw: &str) -> String {
    format!("{}_{}_{}", file_name, size_bytes, captured_at_raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_identity_key_shape() {
        let key = build_identity_key("919~_20240115143022.m4a", 4096, "2024-01-15 14:30:22");
        assert_eq!(key, "919~_20240115143022.m4a_4096_2024-01-15 14:30:22");
    }

    #[test]
    fn test_identity_key_stable_across_calls() {
        let a = build_identity_key("rec.mp3", 123, "");
        let b = build_identity_key("rec.mp3", 123, "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_key_distinguishes_size() {
        let a = build_identity_key("rec.mp3", 123, "2024-01-15 14:30:22");
        let b = build_identity_key("rec.mp3", 124, "2024-01-15 14:30:22");
        assert_ne!(a, b);
    }

    #[test]
    fn test_probe_duration_of_real_wav() {
        let tmp = tempfile::tempdir().unwrap();
        let wav_path = tmp.path().join("tone.wav");

        // 2 seconds of silence at 8 kHz mono
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
        for _ in 0..16000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let millis = probe_duration(&wav_path);
        assert!((1900..=2100).contains(&millis), "got {} ms", millis);
    }

    #[test]
    fn test_probe_duration_garbage_file_returns_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("garbage.mp3");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"this is not audio").unwrap();

        assert_eq!(probe_duration(&path), 0);
    }

    #[test]
    fn test_probe_duration_missing_file_returns_zero() {
        assert_eq!(probe_duration(Path::new("/nonexistent/rec.mp3")), 0);
    }
}
