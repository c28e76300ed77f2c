//! Tri-tier agent memory.
//!
//! Observer holds the last hundred per-tick outcomes in a FIFO ring.
//! Strategist holds session-scoped objective progress and win rates.
//! Tactician holds persistent trigger/response patterns with Bayesian
//! confidence. The consolidator moves facts upward between tiers on a fixed
//! tick interval.

#![forbid(unsafe_code)]

pub mod consolidate;
pub mod observer;
pub mod strategist;
pub mod tactician;

use std::io;

use thiserror::Error;

pub use consolidate::{ConsolidationReport, Consolidator};
pub use observer::{ObservedDelta, ObserverItem, ObserverMemory};
pub use strategist::{ResourceSnapshot, StrategistCheckpoint, StrategistMemory, StrategistRecord};
pub use tactician::{signature_of, TacticianMemory, TacticianPattern};

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory io: {0}")]
    Io(#[from] io::Error),
    #[error("memory parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported schema version {0}")]
    UnsupportedSchema(u32),
}

/// Cheap read snapshot handed to the planner at the start of its step.
///
/// Holds small copied headers, not the tiers themselves; the planner never
/// reads a tier mid-mutation.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    pub recent_success_rate: f32,
    pub observer_len: usize,
    pub objective_win_rates: Vec<(String, f32)>,
    pub pattern_count: usize,
}

impl MemoryView {
    pub fn capture(
        observer: &ObserverMemory,
        strategist: &StrategistMemory,
        tactician: &TacticianMemory,
    ) -> Self {
        Self {
            recent_success_rate: observer.success_rate_last(20),
            observer_len: observer.len(),
            objective_win_rates: strategist
                .records()
                .map(|r| (r.objective_id.clone(), r.win_rate))
                .collect(),
            pattern_count: tactician.len(),
        }
    }

    pub fn win_rate(&self, objective_id: &str) -> Option<f32> {
        self.objective_win_rates
            .iter()
            .find(|(id, _)| id == objective_id)
            .map(|(_, wr)| *wr)
    }
}
