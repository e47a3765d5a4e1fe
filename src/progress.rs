//! Indexing progress reporting.
//!
//! The pipeline emits one [`IndexingProgress`] per processed chunk and one
//! terminal update per document. Reporters decide where those go. For the
//! CLI, progress is emitted on **stderr** so stdout remains parseable for
//! scripts.

use std::io::Write;

use recall_core::models::{IndexingProgress, ProgressState};
use tokio::sync::mpsc;

/// Receives progress updates from the indexing pipeline.
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, progress: &IndexingProgress);
}

/// Human-friendly progress on stderr: "index notes.md  chunk 12 / 40".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, progress: &IndexingProgress) {
        let line = match &progress.state {
            ProgressState::Running => format!(
                "index {}  chunk {} / {}\n",
                progress.file_name,
                format_number(progress.processed_chunks as u64),
                format_number(progress.total_chunks as u64)
            ),
            ProgressState::Completed { chunk_count } => format!(
                "index {}  done  {} chunks\n",
                progress.file_name,
                format_number(*chunk_count as u64)
            ),
            ProgressState::Failed { reason } => {
                format!("index {}  failed: {}\n", progress.file_name, reason)
            }
            ProgressState::Cancelled => format!(
                "index {}  cancelled after {} / {} chunks\n",
                progress.file_name, progress.processed_chunks, progress.total_chunks
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, progress: &IndexingProgress) {
        if let Ok(line) = progress_json(progress) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn progress_json(progress: &IndexingProgress) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(progress)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("event".to_string(), serde_json::json!("progress"));
    }
    serde_json::to_string(&value)
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _progress: &IndexingProgress) {}
}

/// Forwards updates into a channel. Used by spawned indexing tasks; a
/// dropped receiver is ignored.
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<IndexingProgress>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::UnboundedSender<IndexingProgress>) -> Self {
        Self { tx }
    }
}

impl IndexProgressReporter for ChannelProgress {
    fn report(&self, progress: &IndexingProgress) {
        let _ = self.tx.send(progress.clone());
    }
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse `--progress`; `None` picks the TTY default.
    pub fn from_flag(flag: Option<&str>) -> anyhow::Result<Self> {
        match flag {
            None => Ok(Self::default_for_tty()),
            Some("off") => Ok(ProgressMode::Off),
            Some("human") => Ok(ProgressMode::Human),
            Some("json") => Ok(ProgressMode::Json),
            Some(other) => anyhow::bail!(
                "Unknown progress mode: '{}'. Must be off, human, or json.",
                other
            ),
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
