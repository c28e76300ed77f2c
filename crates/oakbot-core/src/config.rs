//! Agent configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main agent configuration, loaded from .oakbot/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Config version
    pub version: Option<String>,

    #[serde(default)]
    pub tick: TickSection,

    #[serde(default)]
    pub hsm: HsmSection,

    #[serde(default)]
    pub profile: ProfileSection,

    #[serde(default)]
    pub anomaly: AnomalySection,

    #[serde(default)]
    pub breakout: BreakoutSection,

    #[serde(default)]
    pub failsafe: FailsafeSection,

    #[serde(default)]
    pub planner: PlannerSection,

    #[serde(default)]
    pub memory: MemorySection,

    #[serde(default)]
    pub snapshot: SnapshotSection,

    /// Structured failsafe event log (JSONL)
    #[serde(default = "default_events_path")]
    pub events_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickSection {
    /// Per-tick wall budget in milliseconds
    pub budget_ms: u64,
    /// Base tick rate
    pub rate_hz: u32,
    /// Consecutive overruns before entering degraded mode
    pub degrade_after_overruns: u32,
    /// Pace ticks to the configured rate. Off for headless fast-forward.
    pub realtime: bool,
}

impl Default for TickSection {
    fn default() -> Self {
        Self {
            budget_ms: 33,
            rate_hz: 30,
            degrade_after_overruns: 3,
            realtime: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HsmSection {
    /// Classification confidence below this counts toward ambiguity escalation
    pub ambiguity_threshold: f32,
}

impl Default for HsmSection {
    fn default() -> Self {
        Self {
            ambiguity_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSection {
    /// EWMA smoothing factor for duration means
    pub ewma_alpha: f64,
    /// Samples before a profile is considered warm
    pub n_min: u64,
    /// Minimum seconds between profile flushes
    pub persist_debounce_secs: u64,
    pub path: PathBuf,
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            ewma_alpha: 0.3,
            n_min: 30,
            persist_debounce_secs: 10,
            path: PathBuf::from(".oakbot/profiles.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalySection {
    pub warn_z: f64,
    pub critical_z: f64,
    pub warn_ratio: f64,
    pub critical_ratio: f64,
}

impl Default for AnomalySection {
    fn default() -> Self {
        Self {
            warn_z: 2.0,
            critical_z: 3.0,
            warn_ratio: 1.5,
            critical_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutSection {
    /// Alarm recurrence window for tier escalation
    pub cooldown_ticks: u64,
    /// Tiers below this success rate are demoted
    pub demote_below_rate: f32,
    pub demote_min_attempts: u32,
    /// Maximum snapshot age a reload tier will accept, in milliseconds
    pub reload_max_age_ms: u64,
}

impl Default for BreakoutSection {
    fn default() -> Self {
        Self {
            cooldown_ticks: 600,
            demote_below_rate: 0.2,
            demote_min_attempts: 10,
            reload_max_age_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeSection {
    pub ai_weight: f32,
    pub vision_weight: f32,
    pub state_weight: f32,
    /// Aggregate confidence below this routes to recovery
    pub min_confidence: f32,
    /// Legal-transition window for state consistency
    pub consistency_window: usize,
    /// Unchanged-position ticks before a deadlock fires
    pub deadlock_ticks: u64,
    /// Action window scanned for oscillation cycles
    pub oscillation_window: usize,
    /// Win-rate observation window for zero progress
    pub zero_progress_window: u64,
    pub zero_progress_epsilon: f32,
}

impl Default for FailsafeSection {
    fn default() -> Self {
        Self {
            ai_weight: 0.4,
            vision_weight: 0.35,
            state_weight: 0.25,
            min_confidence: 0.35,
            consistency_window: 20,
            deadlock_ticks: 600,
            oscillation_window: 12,
            zero_progress_window: 10_000,
            zero_progress_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    pub strategic_every_ticks: u64,
    pub tactical_every_ticks: u64,
    pub discount_gamma: f64,
    pub repair_attempts: u32,
    pub plan_ttl_ticks: u64,
    pub critical_hp_pct: u8,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            strategic_every_ticks: 1000,
            tactical_every_ticks: 30,
            discount_gamma: 0.95,
            repair_attempts: 3,
            plan_ttl_ticks: 600,
            critical_hp_pct: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub observer_capacity: usize,
    pub consolidation_interval_ticks: u64,
    pub promotion_threshold: u32,
    pub decay_lambda: f64,
    pub tactician_log: PathBuf,
    pub sessions_dir: PathBuf,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            observer_capacity: 100,
            consolidation_interval_ticks: 1000,
            promotion_threshold: 3,
            decay_lambda: 6.931e-7,
            tactician_log: PathBuf::from(".oakbot/tactician.log"),
            sessions_dir: PathBuf::from(".oakbot/sessions"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSection {
    /// Rotating ring size; named snapshots live outside the ring
    pub ring_size: usize,
    pub dir: PathBuf,
    /// Bounded async writer queue depth
    pub writer_queue_depth: usize,
}

impl Default for SnapshotSection {
    fn default() -> Self {
        Self {
            ring_size: 10,
            dir: PathBuf::from(".oakbot/snapshots"),
            writer_queue_depth: 4,
        }
    }
}

fn default_events_path() -> PathBuf {
    PathBuf::from(".oakbot/events.jsonl")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: None,
            tick: TickSection::default(),
            hsm: HsmSection::default(),
            profile: ProfileSection::default(),
            anomaly: AnomalySection::default(),
            breakout: BreakoutSection::default(),
            failsafe: FailsafeSection::default(),
            planner: PlannerSection::default(),
            memory: MemorySection::default(),
            snapshot: SnapshotSection::default(),
            events_path: default_events_path(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .oakbot/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".oakbot/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve paths relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.profile.path = project_root.join(&self.profile.path);
        self.memory.tactician_log = project_root.join(&self.memory.tactician_log);
        self.memory.sessions_dir = project_root.join(&self.memory.sessions_dir);
        self.snapshot.dir = project_root.join(&self.snapshot.dir);
        self.events_path = project_root.join(&self.events_path);
    }

    /// Milliseconds per tick at the configured rate.
    pub fn tick_interval_ms(&self) -> u64 {
        1000 / self.tick.rate_hz.max(1) as u64
    }
}
