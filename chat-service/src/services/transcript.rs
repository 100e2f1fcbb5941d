//! Append-only transcript of completed turns.
//!
//! Each entry is two lines sharing one timestamp followed by a blank line:
//!
//! ```text
//! [2024-02-14 20:15:03] USER: I feel heartbroken
//! [2024-02-14 20:15:03] BOT: I'm so sorry you're going through this...
//! ```

use super::metrics;
use chrono::{DateTime, Local, TimeZone};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Failed to write transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Best-effort transcript sink.
///
/// Writes are serialized within the process so an entry's two lines stay
/// adjacent. Nothing is fsynced; a crash may lose or truncate the tail.
#[derive(Debug)]
pub struct TranscriptLog {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl TranscriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// A transcript that records nothing.
    pub fn disabled() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Record a turn. Failures are logged and counted, never returned.
    pub async fn record(&self, user_text: &str, bot_text: &str) {
        if let Err(e) = self.append(user_text, bot_text).await {
            metrics::record_transcript_error();
            tracing::warn!(error = %e, "Transcript write failed");
        }
    }

    /// Append a turn, reporting I/O failures to the caller.
    pub async fn append(&self, user_text: &str, bot_text: &str) -> Result<(), TranscriptError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let entry = format_entry(&Local::now(), user_text, bot_text);
        let io_err = |source| TranscriptError::Io {
            path: path.clone(),
            source,
        };

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(io_err)?;
        file.write_all(entry.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(())
    }
}

/// Render one transcript entry.
pub fn format_entry<Tz>(timestamp: &DateTime<Tz>, user_text: &str, bot_text: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let ts = timestamp.format(TIMESTAMP_FORMAT);
    format!("[{ts}] USER: {user_text}\n[{ts}] BOT: {bot_text}\n\n")
}
