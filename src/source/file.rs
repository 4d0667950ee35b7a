//! File-based data source.
//!
//! Replays a snapshot previously written by `countwatch --export`, for
//! looking at a captured state without a live server.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use super::{DashboardSnapshot, DataSource};

/// A data source that reads an exported snapshot from a JSON file.
///
/// The source tracks the file's modification time and only returns
/// new data when the file has been updated. The description names the
/// capture time of the loaded export.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            last_modified: None,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn load(&self) -> Result<DashboardSnapshot, String> {
        let content = fs::read_to_string(&self.path).map_err(|e| format!("Read error: {}", e))?;
        let snapshot: DashboardSnapshot =
            serde_json::from_str(&content).map_err(|e| format!("Parse error: {}", e))?;
        validate_export(&snapshot)?;
        Ok(snapshot)
    }

    fn read_file(&mut self) -> Option<DashboardSnapshot> {
        match self.load() {
            Ok(snapshot) => {
                self.last_error = if snapshot.has_data() {
                    None
                } else {
                    Some("Export contains no samples".to_string())
                };
                self.description = match snapshot.updated_at {
                    Some(at) => format!(
                        "file: {} @ {}",
                        self.path.display(),
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    ),
                    None => format!("file: {}", self.path.display()),
                };
                debug!(
                    path = %self.path.display(),
                    samples = snapshot.history.len(),
                    "Loaded export"
                );
                Some(snapshot)
            }
            Err(e) => {
                self.last_error = Some(e);
                None
            }
        }
    }
}

/// Checks an export for the shape the engine always produces.
fn validate_export(snapshot: &DashboardSnapshot) -> Result<(), String> {
    if snapshot
        .history
        .windows(2)
        .any(|pair| pair[0].timestamp >= pair[1].timestamp)
    {
        return Err("Invalid export: history is not in ascending time order".to_string());
    }
    if snapshot.history.len() > snapshot.retained {
        return Err(format!(
            "Invalid export: {} history entries but {} retained",
            snapshot.history.len(),
            snapshot.retained
        ));
    }
    if let (Some(updated_at), Some(last)) = (snapshot.updated_at, snapshot.history.last()) {
        if last.timestamp > updated_at {
            return Err("Invalid export: history is newer than the current count".to_string());
        }
    }
    Ok(())
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<DashboardSnapshot> {
        let current_modified = self.get_modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,
            // File disappeared, keep what we have
            (Some(_), None) => false,
            (Some(last), Some(current)) => current > last,
        };

        if file_changed {
            if let Some(snapshot) = self.read_file() {
                self.last_modified = current_modified;
                return Some(snapshot);
            }
        }

        None
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
