//! # Telemetry Logger
//!
//! Appends records to JSON Lines files, rotating after a fixed number of
//! records and keeping only the newest files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use super::record::TelemetryRecord;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// Rotating JSON Lines writer
#[derive(Debug)]
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    session: String,
    file_index: usize,
    records_in_file: usize,
    writer: Option<BufWriter<File>>,
}

impl TelemetryLogger {
    /// Create the log directory and prepare a new session
    ///
    /// Files are named `telemetry_<YYYYMMDD-HHMMSS>_<n>.jsonl`; the first one
    /// is created on the first record.
    ///
    /// # Errors
    ///
    /// Returns error if the log directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir)?;

        let session = Local::now().format("%Y%m%d-%H%M%S").to_string();
        info!("Telemetry log session {} in {}", session, log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            session,
            file_index: 0,
            records_in_file: 0,
            writer: None,
        })
    }

    /// Append one record, rotating first if the current file is full
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be serialized or written
    pub fn log(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        self.records_in_file += 1;
        Ok(())
    }

    /// Path of the file currently being written
    pub fn current_path(&self) -> Option<PathBuf> {
        self.writer.as_ref().map(|_| self.file_path(self.file_index))
    }

    fn file_path(&self, index: usize) -> PathBuf {
        self.log_dir.join(format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX, self.session, index, FILE_EXTENSION
        ))
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            self.file_index += 1;
        }

        let path = self.file_path(self.file_index);
        let file = File::create(&path)?;
        debug!("Opened telemetry log {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Delete the oldest log files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files = list_log_files(&self.log_dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names embed a sortable timestamp and index
        files.sort();
        let excess = files.len() - self.max_files_to_keep;

        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry log {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        Ok(())
    }
}

fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION))
            .unwrap_or(false);

        if is_log {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::decoder::decode_frame;
    use tempfile::TempDir;

    fn config(dir: &TempDir, max_records_per_file: usize, max_files_to_keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().to_string(),
            max_records_per_file,
            max_files_to_keep,
            format: "jsonl".to_string(),
        }
    }

    fn record(raw: &str) -> TelemetryRecord {
        TelemetryRecord::new(&decode_frame(raw).unwrap(), raw, None)
    }

    #[test]
    fn test_no_file_before_first_record() {
        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(&config(&dir, 10, 10)).unwrap();

        assert!(logger.current_path().is_none());
        assert!(list_log_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_log_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, 10, 10)).unwrap();

        logger.log(&record("[6;21.50,40.00]")).unwrap();
        logger.log(&record("[2;101.32,22.50,15.00]")).unwrap();

        let path = logger.current_path().unwrap();
        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["sensor"], "Humidity");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["sensor"], "Barometric");
    }

    #[test]
    fn test_rotation_after_max_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, 2, 10)).unwrap();

        for _ in 0..5 {
            logger.log(&record("[6;21.50,40.00]")).unwrap();
        }

        let mut files = list_log_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(files.len(), 3);

        let line_counts: Vec<_> = files
            .iter()
            .map(|path| fs::read_to_string(path).unwrap().lines().count())
            .collect();
        assert_eq!(line_counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_only_newest_files_are_kept() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, 1, 2)).unwrap();

        for _ in 0..5 {
            logger.log(&record("[6;21.50,40.00]")).unwrap();
        }

        let files = list_log_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&logger.current_path().unwrap()));
    }

    #[test]
    fn test_unrelated_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = TelemetryLogger::new(&config(&dir, 1, 1)).unwrap();
        for _ in 0..3 {
            logger.log(&record("[6;21.50,40.00]")).unwrap();
        }

        assert!(dir.path().join("notes.txt").exists());
    }
}
