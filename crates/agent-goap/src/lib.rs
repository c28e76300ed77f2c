//! Hierarchical goal-oriented action planning.
//!
//! Goals form an acyclic prerequisite/unlock graph. Three layers run at
//! different cadences: the strategic layer recomputes the achievable frontier,
//! the tactical layer turns the best frontier goal into a concrete plan, and
//! the reactive layer may override a single tick with an interrupt. Failed
//! actions are repaired locally; the planner never replans globally mid-tick.

#![forbid(unsafe_code)]

pub mod goal;
pub mod graph;
pub mod plan;
pub mod planner;
pub mod utility;
pub mod world;

pub use goal::{BetaEstimate, Goal, GoalCategory, GoalStatus, StateConstraint, StateEffect};
pub use graph::{GoalGraph, GoalGraphError};
pub use plan::{Plan, PlanError};
pub use planner::{
    GoapPlanner, PlannerConfig, PlannerDecision, PlannerInputs, PlannerLayer,
};
pub use utility::utility;
pub use world::WorldModel;
