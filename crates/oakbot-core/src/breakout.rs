//! Graded break-out remediation for modes that overstay their profile.

use std::collections::HashMap;

use agent_core::{Button, ButtonPress, Mode, ModeKey};
use agent_hsm::{Category, StatePath};

use crate::config::BreakoutSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BreakoutTier {
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl BreakoutTier {
    pub const ALL: [BreakoutTier; 5] = [
        BreakoutTier::L1,
        BreakoutTier::L2,
        BreakoutTier::L3,
        BreakoutTier::L4,
        BreakoutTier::L5,
    ];

    pub fn next(self) -> BreakoutTier {
        match self {
            BreakoutTier::L1 => BreakoutTier::L2,
            BreakoutTier::L2 => BreakoutTier::L3,
            BreakoutTier::L3 => BreakoutTier::L4,
            BreakoutTier::L4 => BreakoutTier::L5,
            BreakoutTier::L5 => BreakoutTier::L5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BreakoutTier::L1 => "L1",
            BreakoutTier::L2 => "L2",
            BreakoutTier::L3 => "L3",
            BreakoutTier::L4 => "L4",
            BreakoutTier::L5 => "L5",
        }
    }
}

/// What a break-out tier actually does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakoutStep {
    /// Inject raw button presses at the head of the action queue.
    Presses(Vec<ButtonPress>),
    /// Reload the most recent safe snapshot no older than the configured age.
    ReloadSnapshot { max_age_ms: u64 },
    /// Hard reset to the last boot-complete snapshot.
    HardReset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakoutPlan {
    pub tier: BreakoutTier,
    pub step: BreakoutStep,
}

#[derive(Debug, Clone, Copy, Default)]
struct TierStats {
    attempts: u32,
    successes: u32,
}

impl TierStats {
    fn success_rate(&self) -> f32 {
        if self.attempts == 0 {
            return 1.0;
        }
        self.successes as f32 / self.attempts as f32
    }
}

#[derive(Debug, Clone, Copy)]
struct ModeBreakoutState {
    tier: BreakoutTier,
    last_alarm_tick: u64,
}

/// Selects and escalates break-out plans per mode.
///
/// Alarms recurring within the cooldown window advance the tier; tiers with
/// a poor track record for a mode are skipped in future selection.
pub struct BreakoutManager {
    config: BreakoutSection,
    per_mode: HashMap<ModeKey, ModeBreakoutState>,
    stats: HashMap<(Mode, BreakoutTier), TierStats>,
}

impl BreakoutManager {
    pub fn new(config: BreakoutSection) -> Self {
        Self {
            config,
            per_mode: HashMap::new(),
            stats: HashMap::new(),
        }
    }

    /// Builds the next break-out plan for an alarmed mode.
    pub fn plan(&mut self, key: ModeKey, path: StatePath, tick: u64) -> BreakoutPlan {
        let tier = self.select_tier(key, tick);
        self.stats.entry((key.mode(), tier)).or_default().attempts += 1;
        BreakoutPlan {
            tier,
            step: self.step_for(tier, path),
        }
    }

    fn select_tier(&mut self, key: ModeKey, tick: u64) -> BreakoutTier {
        let state = self.per_mode.entry(key).or_insert(ModeBreakoutState {
            tier: BreakoutTier::L1,
            last_alarm_tick: tick,
        });

        let within_cooldown = tick.saturating_sub(state.last_alarm_tick) <= self.config.cooldown_ticks;
        let mut tier = if within_cooldown && state.last_alarm_tick != tick {
            state.tier.next()
        } else if within_cooldown {
            state.tier
        } else {
            BreakoutTier::L1
        };
        state.last_alarm_tick = tick;

        // Skip tiers this mode has burned.
        let mode = key.mode();
        while self.is_demoted(mode, tier) && tier != BreakoutTier::L5 {
            tier = tier.next();
        }
        if let Some(state) = self.per_mode.get_mut(&key) {
            state.tier = tier;
        }
        tier
    }

    fn is_demoted(&self, mode: Mode, tier: BreakoutTier) -> bool {
        self.stats
            .get(&(mode, tier))
            .map(|s| {
                s.attempts >= self.config.demote_min_attempts
                    && s.success_rate() < self.config.demote_below_rate
            })
            .unwrap_or(false)
    }

    fn step_for(&self, tier: BreakoutTier, path: StatePath) -> BreakoutStep {
        match tier {
            BreakoutTier::L1 => {
                let presses = (0..10)
                    .map(|_| ButtonPress::new(Button::B, 80, 100))
                    .collect();
                BreakoutStep::Presses(presses)
            }
            BreakoutTier::L2 => {
                let cycle = [
                    Button::Up,
                    Button::Down,
                    Button::Left,
                    Button::Right,
                    Button::A,
                    Button::B,
                ];
                BreakoutStep::Presses(cycle.into_iter().map(ButtonPress::tap).collect())
            }
            BreakoutTier::L3 => BreakoutStep::Presses(menu_escape_sequence(path)),
            BreakoutTier::L4 => BreakoutStep::ReloadSnapshot {
                max_age_ms: self.config.reload_max_age_ms,
            },
            BreakoutTier::L5 => BreakoutStep::HardReset,
        }
    }

    /// Feeds back whether a break-out resolved the alarm (the mode changed
    /// before the next alarm).
    pub fn report(&mut self, key: ModeKey, tier: BreakoutTier, success: bool) {
        let stats = self.stats.entry((key.mode(), tier)).or_default();
        if success {
            stats.successes += 1;
            self.per_mode.remove(&key);
        }
    }

    pub fn current_tier(&self, key: ModeKey) -> Option<BreakoutTier> {
        self.per_mode.get(&key).map(|s| s.tier)
    }

    pub fn success_rate(&self, mode: Mode, tier: BreakoutTier) -> f32 {
        self.stats
            .get(&(mode, tier))
            .map(|s| s.success_rate())
            .unwrap_or(1.0)
    }
}

/// Path-specific escape: back out of nested UI, then dismiss any root menu.
pub fn menu_escape_sequence(path: StatePath) -> Vec<ButtonPress> {
    let mut presses = Vec::new();
    match path.category() {
        Category::Menu => {
            for _ in 0..path.depth() {
                presses.push(ButtonPress::new(Button::B, 80, 120));
            }
            presses.push(ButtonPress::new(Button::Start, 80, 120));
        }
        Category::Battle => {
            // Back out of sub-menus to the command menu, then try to run.
            presses.push(ButtonPress::new(Button::B, 80, 120));
            presses.push(ButtonPress::new(Button::B, 80, 120));
            presses.push(ButtonPress::tap(Button::Down));
            presses.push(ButtonPress::tap(Button::Right));
            presses.push(ButtonPress::tap(Button::A));
        }
        Category::Dialog => {
            for _ in 0..6 {
                presses.push(ButtonPress::new(Button::A, 80, 100));
            }
            presses.push(ButtonPress::new(Button::B, 80, 100));
        }
        _ => {
            presses.push(ButtonPress::new(Button::B, 80, 120));
            presses.push(ButtonPress::new(Button::Start, 80, 120));
        }
    }
    presses
}
