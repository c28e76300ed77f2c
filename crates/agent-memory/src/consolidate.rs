use std::collections::BTreeMap;

use crate::observer::ObserverMemory;
use crate::strategist::StrategistMemory;
use crate::tactician::{signature_of, TacticianMemory};
use crate::MemoryError;

/// Summary of one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub tick: u64,
    pub items_seen: usize,
    pub objectives_updated: usize,
    pub promoted: usize,
    pub pruned: usize,
}

impl ConsolidationReport {
    pub fn summary(&self) -> String {
        format!(
            "tick {}: items {}, objectives {}, promoted {}, pruned {}",
            self.tick, self.items_seen, self.objectives_updated, self.promoted, self.pruned
        )
    }
}

/// Moves facts up the memory tiers on a fixed tick interval.
///
/// A pass is idempotent: invoked twice at the same tick it aggregates no new
/// observer items, promotes nothing new, and decays by a zero interval.
#[derive(Debug, Clone)]
pub struct Consolidator {
    interval_ticks: u64,
    promotion_threshold: u32,
    decay_lambda: f64,
    watermark_tick: u64,
    last_run_tick: Option<u64>,
}

impl Consolidator {
    pub const DEFAULT_INTERVAL: u64 = 1000;
    /// Half-life of roughly a million ticks.
    pub const DEFAULT_DECAY_LAMBDA: f64 = 6.931e-7;

    pub fn new(interval_ticks: u64, promotion_threshold: u32, decay_lambda: f64) -> Self {
        Self {
            interval_ticks: interval_ticks.max(1),
            promotion_threshold: promotion_threshold.max(1),
            decay_lambda,
            watermark_tick: 0,
            last_run_tick: None,
        }
    }

    pub fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    pub fn due(&self, tick: u64) -> bool {
        match self.last_run_tick {
            Some(last) => tick.saturating_sub(last) >= self.interval_ticks,
            None => tick >= self.interval_ticks,
        }
    }

    /// Runs one pass over the tiers. The caller guarantees it is between
    /// ticks; the pass sees exactly the observer items with
    /// `tick_id <= tick`.
    pub fn run(
        &mut self,
        tick: u64,
        observer: &ObserverMemory,
        strategist: &mut StrategistMemory,
        tactician: &mut TacticianMemory,
    ) -> Result<ConsolidationReport, MemoryError> {
        let mut report = ConsolidationReport {
            tick,
            ..Default::default()
        };

        // Observer -> Strategist: aggregate outcomes since the last pass,
        // grouped by acting objective.
        let mut groups: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        for item in observer.since(self.watermark_tick) {
            if item.tick_id > tick {
                continue;
            }
            report.items_seen += 1;
            let Some(action) = item.action.as_deref() else {
                continue;
            };
            let entry = groups.entry(action.to_string()).or_insert((0, 0));
            entry.0 += 1;
            if item.success {
                entry.1 += 1;
            }
        }
        report.objectives_updated = groups.len();
        for (objective, (outcomes, wins)) in &groups {
            strategist.add_evidence(objective, *outcomes, *wins);
        }

        // Strategist -> Tactician: promote records that recurred enough.
        let to_promote: Vec<(String, f32)> = strategist
            .records()
            .filter(|r| !r.promoted && r.evidence >= self.promotion_threshold)
            .map(|r| (r.objective_id.clone(), r.win_rate))
            .collect();
        for (objective, win_rate) in to_promote {
            let sig = signature_of(&[b"objective", objective.as_bytes()]);
            tactician.observe(sig, &objective, win_rate >= 0.5, tick)?;
            strategist.mark_promoted(&objective);
            report.promoted += 1;
        }

        // Forgetting, then pruning, on the persistent tier.
        tactician.decay(tick, self.last_run_tick.unwrap_or(0), self.decay_lambda);
        report.pruned = tactician.prune();

        self.watermark_tick = tick;
        self.last_run_tick = Some(tick);
        Ok(report)
    }
}
