//! JSONL notification outbox
//!
//! Notifications are appended to `.shelter/notifications.jsonl`, one JSON
//! object per line, for an external delivery process to pick up.
//! Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::engine::{Notification, Notifier};

/// Append-only notification outbox
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the outbox file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one notification
    pub fn append(&self, notification: &Notification) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open outbox: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on outbox")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(notification).context("Failed to serialize notification")?;
        writeln!(writer, "{}", line).context("Failed to write notification")?;
        writer.flush().context("Failed to flush outbox")?;

        // Lock is released when file is dropped
        Ok(())
    }

    /// Reads every queued notification in append order
    pub fn read_all(&self) -> Result<Vec<Notification>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open outbox: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on outbox")?;

        let reader = BufReader::new(&file);
        let mut notifications = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let notification: Notification = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse notification at line {}", line_num + 1))?;
            notifications.push(notification);
        }

        Ok(notifications)
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.append(notification)
    }
}
