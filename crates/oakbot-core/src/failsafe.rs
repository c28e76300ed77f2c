//! Failsafe coordination: confidence aggregation, softlock detection, and
//! the recovery ladder.

use std::collections::VecDeque;

use crate::config::FailsafeSection;

/// Weighted confidence aggregate for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceReport {
    pub ai: f32,
    pub vision: f32,
    pub state_consistency: f32,
    pub aggregate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftlockKind {
    PositionDeadlock,
    ActionOscillation,
    ZeroProgress,
}

/// Rungs of the recovery ladder, climbed on repeated triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecoveryStep {
    /// Ask the planner for a simpler reactive goal.
    ReactiveInterrupt,
    /// Force a menu-escape sequence through the break-out manager.
    MenuEscape,
    /// Load the last snapshot.
    LoadSnapshot,
    /// Snapshots exhausted; shut down gracefully.
    Shutdown,
}

impl RecoveryStep {
    fn next(self) -> RecoveryStep {
        match self {
            RecoveryStep::ReactiveInterrupt => RecoveryStep::MenuEscape,
            RecoveryStep::MenuEscape => RecoveryStep::LoadSnapshot,
            RecoveryStep::LoadSnapshot => RecoveryStep::Shutdown,
            RecoveryStep::Shutdown => RecoveryStep::Shutdown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PositionWatch {
    position: (u8, u8, u8),
    since_tick: u64,
}

/// Aggregates per-tick health signals and decides when to intervene.
pub struct FailsafeCoordinator {
    config: FailsafeSection,
    legal_history: VecDeque<bool>,
    action_history: VecDeque<String>,
    position: Option<PositionWatch>,
    movement_pending: bool,
    win_rate_samples: VecDeque<(u64, f32)>,
    ladder: Option<RecoveryStep>,
    ladder_tick: u64,
    snapshot_load_failures: u32,
}

impl FailsafeCoordinator {
    /// Ticks after which an idle ladder resets to the bottom rung.
    const LADDER_RESET_TICKS: u64 = 1200;
    /// Minimum ticks a rung is given to work before the next one fires.
    const RUNG_HOLD_TICKS: u64 = 60;

    pub fn new(config: FailsafeSection) -> Self {
        Self {
            config,
            legal_history: VecDeque::new(),
            action_history: VecDeque::new(),
            position: None,
            movement_pending: false,
            win_rate_samples: VecDeque::new(),
            ladder: None,
            ladder_tick: 0,
            snapshot_load_failures: 0,
        }
    }

    /// Folds one tick's health signals in.
    pub fn observe_tick(
        &mut self,
        tick: u64,
        transition_legal: bool,
        position: (u8, u8, u8),
        action_name: Option<&str>,
        action_is_movement: bool,
        aggregate_win_rate: f32,
    ) {
        self.legal_history.push_back(transition_legal);
        while self.legal_history.len() > self.config.consistency_window {
            self.legal_history.pop_front();
        }

        if let Some(name) = action_name {
            self.action_history.push_back(name.to_string());
            while self.action_history.len() > self.config.oscillation_window {
                self.action_history.pop_front();
            }
        }

        match &mut self.position {
            Some(watch) if watch.position == position => {}
            _ => {
                self.position = Some(PositionWatch {
                    position,
                    since_tick: tick,
                });
            }
        }
        self.movement_pending = action_is_movement;

        self.win_rate_samples.push_back((tick, aggregate_win_rate));
        let horizon = tick.saturating_sub(self.config.zero_progress_window * 2);
        while self
            .win_rate_samples
            .front()
            .map(|(t, _)| *t < horizon)
            .unwrap_or(false)
        {
            self.win_rate_samples.pop_front();
        }
    }

    /// Weighted confidence. An absent oracle scores full marks.
    pub fn score(&self, ai_confidence: Option<f32>, vision_confidence: f32) -> ConfidenceReport {
        let ai = ai_confidence.unwrap_or(1.0).clamp(0.0, 1.0);
        let vision = vision_confidence.clamp(0.0, 1.0);
        let state = if self.legal_history.is_empty() {
            1.0
        } else {
            let legal = self.legal_history.iter().filter(|l| **l).count() as f32;
            legal / self.legal_history.len() as f32
        };

        let aggregate = (self.config.ai_weight * ai
            + self.config.vision_weight * vision
            + self.config.state_weight * state)
            .clamp(0.0, 1.0);

        ConfidenceReport {
            ai,
            vision,
            state_consistency: state,
            aggregate,
        }
    }

    pub fn is_low(&self, report: &ConfidenceReport) -> bool {
        report.aggregate < self.config.min_confidence
    }

    /// Runs all softlock detectors for this tick.
    pub fn detect_softlocks(&self, tick: u64) -> Vec<SoftlockKind> {
        let mut hits = Vec::new();

        if self.movement_pending {
            if let Some(watch) = &self.position {
                if tick.saturating_sub(watch.since_tick) >= self.config.deadlock_ticks {
                    hits.push(SoftlockKind::PositionDeadlock);
                }
            }
        }

        if self.position_is_stuck(tick) && has_short_cycle(&self.action_history) {
            hits.push(SoftlockKind::ActionOscillation);
        }

        if let Some(delta) = self.win_rate_delta(tick) {
            if delta.abs() < self.config.zero_progress_epsilon {
                hits.push(SoftlockKind::ZeroProgress);
            }
        }

        hits
    }

    fn position_is_stuck(&self, tick: u64) -> bool {
        self.position
            .map(|w| tick.saturating_sub(w.since_tick) >= self.config.oscillation_window as u64)
            .unwrap_or(false)
    }

    /// Win-rate movement over the configured window, once it is spanned.
    fn win_rate_delta(&self, tick: u64) -> Option<f32> {
        let window_start = tick.checked_sub(self.config.zero_progress_window)?;
        let oldest = self.win_rate_samples.front()?;
        if oldest.0 > window_start {
            return None;
        }
        let baseline = self
            .win_rate_samples
            .iter()
            .take_while(|(t, _)| *t <= window_start)
            .last()?;
        let latest = self.win_rate_samples.back()?;
        Some(latest.1 - baseline.1)
    }

    /// Advances the recovery ladder for a trigger and returns the rung to
    /// execute, or `None` while the current rung is still being given time
    /// to work. The ladder resets after a quiet stretch.
    pub fn escalate(&mut self, tick: u64) -> Option<RecoveryStep> {
        let step = match self.ladder {
            Some(step) => {
                let since = tick.saturating_sub(self.ladder_tick);
                if since < Self::RUNG_HOLD_TICKS {
                    return None;
                }
                if since <= Self::LADDER_RESET_TICKS {
                    step.next()
                } else {
                    RecoveryStep::ReactiveInterrupt
                }
            }
            None => RecoveryStep::ReactiveInterrupt,
        };
        self.ladder = Some(step);
        self.ladder_tick = tick;
        Some(step)
    }

    /// Clears the ladder after recovery demonstrably worked.
    pub fn reset_ladder(&mut self) {
        self.ladder = None;
        self.snapshot_load_failures = 0;
    }

    /// Records a failed snapshot load during recovery. Repeated failures in
    /// one session are fatal.
    pub fn record_snapshot_failure(&mut self) -> bool {
        self.snapshot_load_failures += 1;
        self.snapshot_load_failures >= 2
    }

    pub fn current_rung(&self) -> Option<RecoveryStep> {
        self.ladder
    }
}

/// Detects a period-2 or period-3 cycle covering the whole recent window.
fn has_short_cycle(history: &VecDeque<String>) -> bool {
    for period in [2usize, 3] {
        if history.len() < period * 2 {
            continue;
        }
        let items: Vec<&String> = history.iter().collect();
        let cycles = items.len() / period;
        if cycles < 2 {
            continue;
        }
        let tail = &items[items.len() - cycles * period..];
        let pattern = &tail[..period];
        if pattern.iter().all(|p| p == &pattern[0]) {
            // A constant window is repetition, not oscillation.
            continue;
        }
        if tail
            .chunks(period)
            .all(|chunk| chunk.iter().zip(pattern).all(|(a, b)| a == b))
        {
            return true;
        }
    }
    false
}
