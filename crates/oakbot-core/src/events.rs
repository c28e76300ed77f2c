//! Structured failsafe events and the JSONL sink.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailsafeEventKind {
    AmbiguousState,
    AnomalyWarn,
    AnomalyCritical,
    Breakout,
    PositionDeadlock,
    ActionOscillation,
    ZeroProgress,
    LowConfidence,
    SnapshotRestored,
    SnapshotWriteFailed,
    GracefulStop,
    FatalShutdown,
    EmulatorFatal,
}

/// The cross-cutting failure event every recovery path emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailsafeEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: FailsafeEventKind,
    pub tick_id: u64,
    /// Stable state-path id at the time of the event
    pub path: Option<String>,
    pub mode: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

impl FailsafeEvent {
    pub fn new(kind: FailsafeEventKind, tick_id: u64, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            tick_id,
            path: None,
            mode: None,
            reason: reason.into(),
            snapshot_id: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_snapshot(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }
}

/// Append-only JSONL sink for failsafe events.
pub struct EventEmitter {
    events_path: PathBuf,
}

impl EventEmitter {
    pub fn new(events_path: impl Into<PathBuf>) -> Self {
        Self {
            events_path: events_path.into(),
        }
    }

    /// Emit an event.
    pub fn emit(&self, event: &FailsafeEvent) -> Result<()> {
        if let Some(parent) = self.events_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)?;

        let line = serde_json::to_string(event)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Read recent events.
    pub fn read_recent(&self, limit: usize) -> Vec<FailsafeEvent> {
        let file = match std::fs::File::open(&self.events_path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let mut events: Vec<FailsafeEvent> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if events.len() > limit {
            events.drain(0..events.len() - limit);
        }

        events
    }
}
