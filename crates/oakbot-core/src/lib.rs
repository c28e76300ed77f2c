//! Oakbot Core - autonomous Pokémon agent kernel
//!
//! This crate provides the kernel logic that drives a Game Boy Pokémon
//! emulator to completion: the fixed-order tick pipeline, duration-profile
//! learning and anomaly detection, graded break-out recovery, failsafe
//! confidence scoring, tri-tier memory wiring, snapshot rotation, and button
//! dispatch.

pub mod anomaly;
pub mod breakout;
pub mod config;
pub mod dispatcher;
pub mod emulator;
pub mod events;
pub mod failsafe;
pub mod oracle;
pub mod perception;
pub mod profile;
pub mod scheduler;
pub mod snapshot;
pub mod status;

pub use anomaly::{Alarm, AnomalyDetector, AnomalyReading};
pub use breakout::{BreakoutManager, BreakoutPlan, BreakoutStep, BreakoutTier};
pub use config::AgentConfig;
pub use dispatcher::{ButtonDispatcher, DispatchOutcome};
pub use emulator::{EmulatorError, EmulatorPort, ScriptedEmulator};
pub use events::{EventEmitter, FailsafeEvent, FailsafeEventKind};
pub use failsafe::{ConfidenceReport, FailsafeCoordinator, RecoveryStep, SoftlockKind};
pub use oracle::{DecisionOracle, NullOracle};
pub use perception::{PerceptionError, PerceptionProvider, StubPerception};
pub use profile::{DurationProfile, ModeDurationTracker, ModeTransition};
pub use scheduler::{Scheduler, SchedulerHandle, SessionSummary, StopCondition, StopReason};
pub use snapshot::{SnapshotMeta, SnapshotReason, SnapshotStore};
pub use status::AgentStatus;
