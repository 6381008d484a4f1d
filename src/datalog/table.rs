//! # Tabular Log
//!
//! Append-only CSV record of every accepted journey point.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::LogPoint;

/// Column header row.
pub const CSV_HEADER: &str =
    "Timestamp,Latitude,Longitude,Altitude(m),Speed(mph),Satellites Seen,Satellites Used,Fix Status\n";

/// Row timestamp format (local time, one-second resolution).
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An open CSV journey table.
#[derive(Debug)]
pub struct TabularLog {
    pub(super) file: File,
    path: PathBuf,
}

impl TabularLog {
    /// Create a new table file containing just the header row.
    ///
    /// Never replaces an existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(CSV_HEADER.as_bytes())?;
        file.flush()?;
        Ok(Self { file, path })
    }

    /// Append one row for `point`, stamped with `at`.
    pub fn append(&mut self, point: &LogPoint, at: DateTime<Local>) -> io::Result<()> {
        let row = format_row(point, at);
        self.file.write_all(row.as_bytes())?;
        self.file.flush()
    }

    /// Current file length in bytes.
    pub fn byte_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Cut the file back to `len` bytes, undoing later rows.
    pub fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::Start(len))?;
        Ok(())
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn format_row(point: &LogPoint, at: DateTime<Local>) -> String {
    format!(
        "{},{},{},{},{},{},{},{}\n",
        at.format(CSV_TIMESTAMP_FORMAT),
        point.position.latitude,
        point.position.longitude,
        point.altitude,
        point.speed_mph,
        point.satellites_seen,
        point.satellites_used,
        point.quality.mode(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::fix::{FixQuality, Position};
    use chrono::TimeZone;
    use std::fs;

    fn sample_point() -> LogPoint {
        LogPoint {
            position: Position::new(37.5, -122.25),
            altitude: 15.5,
            speed_mph: 30.25,
            satellites_seen: 11,
            satellites_used: 8,
            quality: FixQuality::Fix3D,
        }
    }

    #[test]
    fn test_format_row() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 9).unwrap();
        assert_eq!(
            format_row(&sample_point(), at),
            "2024-05-01 14:03:09,37.5,-122.25,15.5,30.25,11,8,3\n"
        );
    }

    #[test]
    fn test_create_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journey.csv");
        let mut table = TabularLog::create(&path).unwrap();
        assert_eq!(table.path(), path.as_path());

        let at = Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 9).unwrap();
        table.append(&sample_point(), at).unwrap();
        table.sync().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(format!("{}\n", lines[0]), CSV_HEADER);
        assert!(lines[1].starts_with("2024-05-01 14:03:09,"));
        assert_eq!(lines[1].split(',').count(), 8);
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journey.csv");
        fs::write(&path, "keep me\n").unwrap();

        let err = TabularLog::create(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");
    }

    #[test]
    fn test_truncate_drops_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = TabularLog::create(dir.path().join("journey.csv")).unwrap();
        let header_len = table.byte_len().unwrap();
        assert_eq!(header_len, CSV_HEADER.len() as u64);

        let at = Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 9).unwrap();
        table.append(&sample_point(), at).unwrap();
        assert!(table.byte_len().unwrap() > header_len);

        table.truncate(header_len).unwrap();
        assert_eq!(fs::read_to_string(table.path()).unwrap(), CSV_HEADER);
    }
}
