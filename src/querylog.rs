//! Append-only command log
//!
//! One JSON object per line: `{"q": [command, payload], "sessionId": ..., "time": ...}`.
//! Accepted lines are what [`ResourceStore`](crate::resources::ResourceStore)
//! later reads back as the example pool.

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub struct QueryLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl QueryLog {
    /// Open (creating if needed) the log for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one received command
    pub fn record(&self, session_id: &str, command: &Value) -> Result<()> {
        let entry = json!({
            "q": command,
            "sessionId": session_id,
            "time": Utc::now().to_rfc3339(),
        });
        let line = serde_json::to_string(&entry)?;

        let mut file = self.file.lock();
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}
