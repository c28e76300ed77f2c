use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Milestone,
    Battle,
    Navigation,
    Item,
    Maintenance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
}

/// Closed set of world-state predicates goals gate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateConstraint {
    HasBadge(String),
    AtLocation(String),
    MinLevel(u8),
    MinMoney(u32),
    HasItem(String),
    PartyHealthyAbove(u8),
}

/// Closed set of world-state mutations a completed goal applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateEffect {
    GrantBadge(String),
    MoveTo(String),
    AddItem(String, u8),
}

/// Bayesian success-rate estimate under a Beta(1, 1) prior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaEstimate {
    pub successes: u32,
    pub failures: u32,
}

impl BetaEstimate {
    pub fn update(&mut self, success: bool) {
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Posterior mean, in (0, 1).
    pub fn mean(&self) -> f64 {
        let n = (self.successes + self.failures) as f64;
        (1.0 + self.successes as f64) / (2.0 + n)
    }
}

/// A node in the goal graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub category: GoalCategory,
    pub base_priority: i32,

    /// Goal ids that must be completed first.
    #[serde(default)]
    pub prereqs: BTreeSet<String>,

    /// Goal ids this goal opens up. Informational; the frontier is computed
    /// from `prereqs`.
    #[serde(default)]
    pub unlocks: BTreeSet<String>,

    /// World-state constraints that must hold for the goal to be attempted.
    #[serde(default)]
    pub required_state: Vec<StateConstraint>,

    /// Applied to the world model when the goal completes.
    #[serde(default)]
    pub effects: Vec<StateEffect>,

    /// The goal is complete once the world satisfies all of these.
    #[serde(default)]
    pub success_when: Vec<StateConstraint>,

    /// The goal fails permanently once the world satisfies any of these.
    #[serde(default)]
    pub failure_when: Vec<StateConstraint>,

    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_attempt_tick: Option<u64>,
    #[serde(default)]
    pub success: BetaEstimate,
    /// Tactical-layer hint in [-0.3, 0.3].
    #[serde(default)]
    pub priority_modifier: f32,
}

impl Goal {
    pub fn new(id: impl Into<String>, category: GoalCategory, base_priority: i32) -> Self {
        Self {
            id: id.into(),
            category,
            base_priority,
            prereqs: BTreeSet::new(),
            unlocks: BTreeSet::new(),
            required_state: Vec::new(),
            effects: Vec::new(),
            success_when: Vec::new(),
            failure_when: Vec::new(),
            status: GoalStatus::default(),
            attempts: 0,
            last_attempt_tick: None,
            success: BetaEstimate::default(),
            priority_modifier: 0.0,
        }
    }

    pub fn with_prereqs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.prereqs = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_state(mut self, constraints: Vec<StateConstraint>) -> Self {
        self.required_state = constraints;
        self
    }

    pub fn with_effects(mut self, effects: Vec<StateEffect>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_success_when(mut self, constraints: Vec<StateConstraint>) -> Self {
        self.success_when = constraints;
        self
    }

    pub fn set_priority_modifier(&mut self, modifier: f32) {
        self.priority_modifier = modifier.clamp(-0.3, 0.3);
    }

    pub fn record_attempt(&mut self, tick: u64, success: bool) {
        self.attempts += 1;
        self.last_attempt_tick = Some(tick);
        self.success.update(success);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, GoalStatus::Completed | GoalStatus::Failed)
    }
}
