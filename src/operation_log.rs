//! Backup log of applied mutations.
//!
//! Every move, rename and delete an apply run performs is recorded here and
//! written once, at the end of the run, to a timestamped JSON file:
//!
//! ```json
//! {
//!   "timestamp": "20240315_101500",
//!   "target_folder": "/home/user/Downloads",
//!   "operations": ["Moved: /home/user/Downloads/a.pdf → /home/user/Downloads/Mar/Documents/a.pdf"]
//! }
//! ```
//!
//! The log is write-only; nothing in this crate reads it back.

use crate::file_organizer::{FileOrganizer, Operation, OrganizeError, OrganizeResult};
use chrono::{DateTime, Local};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// Mutations of one apply run.
#[derive(Debug, Clone)]
pub struct OperationLog {
    started: DateTime<Local>,
    target_folder: PathBuf,
    operations: Vec<Operation>,
}

impl OperationLog {
    /// Starts an empty log for a run against `target_folder`.
    pub fn new(target_folder: PathBuf) -> Self {
        Self {
            started: Local::now(),
            target_folder,
            operations: Vec::new(),
        }
    }

    /// Appends an operation.
    pub fn record(&mut self, operation: Operation) {
        tracing::info!("{}", operation);
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Run timestamp in the `YYYYMMDD_HHMMSS` form used for file names.
    pub fn timestamp(&self) -> String {
        self.started.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Writes the log into `log_directory` and returns the file path.
    ///
    /// The directory is created if needed. If a log with the same timestamp
    /// already exists the new file gets a numbered suffix.
    pub fn save(&self, log_directory: &Path) -> OrganizeResult<PathBuf> {
        FileOrganizer::ensure_directory(log_directory).map_err(|e| {
            OrganizeError::LogWriteFailed {
                path: log_directory.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let timestamp = self.timestamp();
        let log_path = FileOrganizer::free_path(log_directory, &format!("backup_{}.json", timestamp));

        let json = json!({
            "timestamp": timestamp,
            "target_folder": self.target_folder.to_string_lossy(),
            "operations": self.operations.iter().map(|op| op.to_string()).collect::<Vec<_>>(),
        });

        let json_string =
            serde_json::to_string_pretty(&json).map_err(|e| OrganizeError::LogWriteFailed {
                path: log_path.clone(),
                reason: format!("JSON serialization failed: {}", e),
            })?;

        fs::write(&log_path, json_string).map_err(|e| OrganizeError::LogWriteFailed {
            path: log_path.clone(),
            reason: e.to_string(),
        })?;

        Ok(log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_save_writes_operations() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let log_dir = temp_dir.path().join("logs");

        let mut log = OperationLog::new(PathBuf::from("/data"));
        log.record(Operation::Moved {
            from: PathBuf::from("/data/a.pdf"),
            to: PathBuf::from("/data/Documents/a.pdf"),
        });
        log.record(Operation::Deleted {
            path: PathBuf::from("/data/b.tmp"),
        });

        let path = log.save(&log_dir).expect("Failed to save log");
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("backup_"));
        assert!(file_name.ends_with(".json"));

        let json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["timestamp"], log.timestamp());
        assert_eq!(json["target_folder"], "/data");
        assert_eq!(
            json["operations"],
            serde_json::json!([
                "Moved: /data/a.pdf → /data/Documents/a.pdf",
                "Deleted: /data/b.tmp"
            ])
        );
    }

    #[test]
    fn test_same_second_logs_do_not_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let log = OperationLog::new(PathBuf::from("/data"));

        let first = log.save(temp_dir.path()).unwrap();
        let second = log.save(temp_dir.path()).unwrap();
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }
}
