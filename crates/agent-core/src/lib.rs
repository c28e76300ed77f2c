//! Deterministic, emulator-agnostic agent kernel primitives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod button;
pub mod mode;
pub mod observation;
pub mod tick;

pub use action::{ActionError, ActionKind, ActionOutcome, AgentAction, BattleStrategy};
pub use button::{Button, ButtonPress};
pub use mode::{Mode, ModeKey, ParseModeKeyError, SubMode};
pub use observation::{Observation, ObservationFlags, ScreenKind, Sprite};
pub use tick::Cadence;
