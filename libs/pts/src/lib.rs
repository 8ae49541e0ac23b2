//! Per-frame capture timestamp logs.
//!
//! A PTS file holds one timestamp per captured frame, one value per line,
//! in microseconds. Lines starting with `#` are headers written by capture
//! tools (`rpicam-vid --save-pts`, ffmpeg's `mkvtimestamp_v2` muxer) and
//! are skipped.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PtsError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: invalid timestamp {value:?}")]
    Parse {
        path: String,
        line: usize,
        value: String,
    },
}

/// Read a timestamp series from a PTS file.
pub fn read_series(path: &Path) -> Result<Vec<f64>, PtsError> {
    let text = fs::read_to_string(path).map_err(|source| PtsError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut series = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| PtsError::Parse {
            path: path.display().to_string(),
            line: idx + 1,
            value: line.to_string(),
        })?;
        series.push(value);
    }
    Ok(series)
}

/// Write a timestamp series, one value per line.
pub fn write_series(path: &Path, series: &[f64]) -> Result<(), PtsError> {
    let mut out = String::with_capacity(series.len() * 12);
    for value in series {
        let _ = writeln!(out, "{}", value);
    }
    fs::write(path, out).map_err(|source| PtsError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Shift a series so its first timestamp is zero. Capture clocks are
/// independent per node; only relative spacing is meaningful.
pub fn normalize(series: &mut [f64]) {
    if let Some(&first) = series.first() {
        for value in series.iter_mut() {
            *value -= first;
        }
    }
}

/// Capture timestamps must never go backwards.
pub fn is_monotonic(series: &[f64]) -> bool {
    series.windows(2).all(|w| w[0] <= w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn reads_plain_values() {
        let file = write_tmp("0\n33366.7\n66733.3\n");
        assert_eq!(read_series(file.path()).unwrap(), vec![0.0, 33366.7, 66733.3]);
    }

    #[test]
    fn skips_headers_and_blank_lines() {
        let file = write_tmp("# timecode format v2\n\n0\n40000\n");
        assert_eq!(read_series(file.path()).unwrap(), vec![0.0, 40000.0]);
    }

    #[test]
    fn reports_bad_line_with_position() {
        let file = write_tmp("0\nnot-a-number\n");
        match read_series(file.path()) {
            Err(PtsError::Parse { line, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "not-a-number");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn normalize_shifts_to_zero() {
        let mut series = vec![1000.0, 1100.0, 1350.0];
        normalize(&mut series);
        assert_eq!(series, vec![0.0, 100.0, 350.0]);

        let mut empty: Vec<f64> = Vec::new();
        normalize(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn round_trips_through_write() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let series = vec![0.0, 100.5, 200.25];
        write_series(file.path(), &series).unwrap();
        assert_eq!(read_series(file.path()).unwrap(), series);
    }

    #[test]
    fn monotonic_check() {
        assert!(is_monotonic(&[0.0, 1.0, 1.0, 2.0]));
        assert!(!is_monotonic(&[0.0, 2.0, 1.0]));
        assert!(is_monotonic(&[]));
    }
}
