//! JSON file persistence for [`History`]
//!
//! Saves replace the file atomically (write a temp file next to it, sync,
//! rename), so a crash mid-save leaves the previous history readable. The
//! store does not lock: at most one process may merge into a given file at
//! a time.

use crate::history::History;
use costaudit_core::error::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A history persisted as pretty-printed JSON at a fixed path
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store for a file path; nothing is read or written yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored history
    ///
    /// A missing file is not an error and yields an empty history. A file
    /// that exists but does not hold a valid history is.
    pub fn load(&self) -> Result<History> {
        if !self.path.exists() {
            debug!("No history at {}, starting fresh", self.path.display());
            return Ok(History::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let history: History = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} series over {} periods from {}",
            history.len(),
            history.periods().len(),
            self.path.display()
        );
        Ok(history)
    }

    /// Replace the stored history
    pub fn save(&self, history: &History) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(history)?;
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        info!(
            "Saved history ({} series, latest period {}) to {}",
            history.len(),
            history
                .latest_period()
                .map(|period| period.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the stored history
    pub fn clean(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("Removed history at {}", self.path.display());
        }
        Ok(())
    }
}
