//! Hierarchical game-state machine.
//!
//! Classifies per-tick observations into a legal state path (category, optional
//! group, leaf), enforces the transition table, and surfaces transition events
//! to between-tick subscribers. Classification is a decision tree keyed first
//! on the perceived screen kind, then on observation flags and OCR markers.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod classify;
pub mod path;
pub mod state;
pub mod table;

pub use classify::{Classification, Hsm, HsmError, TransitionEvent};
pub use path::StatePath;
pub use state::{Category, GameState, StateGroup};
pub use table::TransitionTable;
