use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MemoryError;

const CHECKPOINT_SCHEMA: u32 = 1;

/// Point-in-time resource counts used by planner preconditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub money: u32,
    pub potions: u16,
    pub pokeballs: u16,
    pub party_hp_pct: u8,
}

/// Session-scoped record of one objective's standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategistRecord {
    pub objective_id: String,
    /// In [0, 1]. Non-decreasing while `monotone` is set.
    pub progress: f32,
    pub win_rate: f32,
    pub attempts: u32,
    pub wins: u32,
    /// Total observations folded in by consolidation.
    pub evidence: u32,
    /// Set once the record has been promoted into the tactician tier.
    pub promoted: bool,
    pub monotone: bool,
    pub resources: ResourceSnapshot,
}

impl StrategistRecord {
    fn new(objective_id: &str) -> Self {
        Self {
            objective_id: objective_id.to_string(),
            progress: 0.0,
            win_rate: 0.0,
            attempts: 0,
            wins: 0,
            evidence: 0,
            promoted: false,
            monotone: true,
            resources: ResourceSnapshot::default(),
        }
    }
}

/// Session key-value tier. Iteration order is stable for checkpointing.
#[derive(Debug, Clone)]
pub struct StrategistMemory {
    session_id: String,
    records: BTreeMap<String, StrategistRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StrategistCheckpoint {
    pub schema: u32,
    pub session_id: String,
    pub records: BTreeMap<String, StrategistRecord>,
}

impl StrategistMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            records: BTreeMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, objective_id: &str) -> Option<&StrategistRecord> {
        self.records.get(objective_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &StrategistRecord> {
        self.records.values()
    }

    fn entry(&mut self, objective_id: &str) -> &mut StrategistRecord {
        self.records
            .entry(objective_id.to_string())
            .or_insert_with(|| StrategistRecord::new(objective_id))
    }

    /// Updates an objective's progress. Monotone objectives never regress.
    pub fn set_progress(&mut self, objective_id: &str, progress: f32) {
        let record = self.entry(objective_id);
        let clamped = progress.clamp(0.0, 1.0);
        record.progress = if record.monotone {
            record.progress.max(clamped)
        } else {
            clamped
        };
    }

    /// Folds one attempt outcome into the objective's win rate.
    pub fn record_outcome(&mut self, objective_id: &str, won: bool) {
        let record = self.entry(objective_id);
        record.attempts += 1;
        if won {
            record.wins += 1;
        }
        record.win_rate = record.wins as f32 / record.attempts as f32;
    }

    /// Folds one consolidation aggregate into the record.
    pub fn add_evidence(&mut self, objective_id: &str, outcomes: u32, wins: u32) {
        let record = self.entry(objective_id);
        record.evidence += outcomes;
        record.attempts += outcomes;
        record.wins += wins;
        if record.attempts > 0 {
            record.win_rate = record.wins as f32 / record.attempts as f32;
        }
    }

    pub fn mark_promoted(&mut self, objective_id: &str) {
        self.entry(objective_id).promoted = true;
    }

    pub fn set_resources(&mut self, objective_id: &str, resources: ResourceSnapshot) {
        self.entry(objective_id).resources = resources;
    }

    /// Mean win rate across all objectives with at least one attempt.
    pub fn aggregate_win_rate(&self) -> f32 {
        let tried: Vec<f32> = self
            .records
            .values()
            .filter(|r| r.attempts > 0)
            .map(|r| r.win_rate)
            .collect();
        if tried.is_empty() {
            return 0.0;
        }
        tried.iter().sum::<f32>() / tried.len() as f32
    }

    /// Writes the whole tier as a single checkpoint blob.
    pub fn checkpoint(&self, path: &Path) -> Result<(), MemoryError> {
        let checkpoint = StrategistCheckpoint {
            schema: CHECKPOINT_SCHEMA,
            session_id: self.session_id.clone(),
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&checkpoint)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn restore(path: &Path) -> Result<Self, MemoryError> {
        let content = fs::read_to_string(path)?;
        let checkpoint: StrategistCheckpoint = serde_json::from_str(&content)?;
        if checkpoint.schema != CHECKPOINT_SCHEMA {
            return Err(MemoryError::UnsupportedSchema(checkpoint.schema));
        }
        Ok(Self {
            session_id: checkpoint.session_id,
            records: checkpoint.records,
        })
    }
}
