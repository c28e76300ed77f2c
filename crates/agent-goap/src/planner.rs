use agent_core::{
    ActionKind, ActionOutcome, AgentAction, BattleStrategy, Button, Cadence, ModeKey,
};
use agent_memory::MemoryView;

use crate::goal::{Goal, GoalCategory, StateConstraint};
use crate::graph::{GoalGraph, GoalGraphError};
use crate::plan::Plan;
use crate::utility::{best_goal_id, utility};
use crate::world::WorldModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    pub strategic_every_ticks: u64,
    pub tactical_every_ticks: u64,
    pub discount_gamma: f64,
    pub repair_attempts: u32,
    pub plan_ttl_ticks: u64,
    pub critical_hp_pct: u8,
}

impl Default for PlannerConfig {
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

/// Per-tick planner inputs distilled by the kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerInputs {
    pub tick: u64,
    pub mode: Option<ModeKey>,
    pub mode_changed: bool,
    /// A badge or comparable milestone changed since the last tick.
    pub milestone_changed: bool,
    pub hp_pct: Option<u8>,
    pub dialog_choice_pending: bool,
    pub battle_started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerLayer {
    Strategic,
    Tactical,
    Reactive,
}

/// What the planner decided for this tick.
#[derive(Debug, Clone, Default)]
pub struct PlannerDecision {
    pub action: Option<AgentAction>,
    pub layer: Option<PlannerLayer>,
    pub goal_id: Option<String>,
    pub completed_goals: Vec<String>,
    pub failed_goal: Option<String>,
}

/// Hierarchical GOAP planner.
///
/// Owns the goal registry; everything else refers to goals by id only.
pub struct GoapPlanner {
    graph: GoalGraph,
    config: PlannerConfig,
    strategic_cadence: Cadence,
    tactical_cadence: Cadence,
    frontier: Vec<String>,
    plan: Option<Plan>,
    repairs_used: u32,
}

impl GoapPlanner {
    pub fn new(goals: Vec<Goal>, config: PlannerConfig) -> Result<Self, GoalGraphError> {
        let graph = GoalGraph::from_goals(goals)?;
        Ok(Self {
            graph,
            config,
            strategic_cadence: Cadence::every(config.strategic_every_ticks),
            tactical_cadence: Cadence::every(config.tactical_every_ticks),
            frontier: Vec::new(),
            plan: None,
            repairs_used: 0,
        })
    }

    pub fn graph(&self) -> &GoalGraph {
        &self.graph
    }

    pub fn frontier(&self) -> &[String] {
        &self.frontier
    }

    pub fn current_goal_id(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.goal_id())
    }

    /// Nudges a goal's utility. Hints are clamped to ±0.3.
    pub fn set_priority_hint(&mut self, goal_id: &str, modifier: f32) {
        if let Some(goal) = self.graph.get_mut(goal_id) {
            goal.set_priority_modifier(modifier);
        }
    }

    /// Abandons the current plan without failing its goal. Used by recovery
    /// and shutdown.
    pub fn abandon_plan(&mut self) {
        self.plan = None;
        self.repairs_used = 0;
    }

    /// One planner step. Layers run by cadence; a reactive interrupt
    /// supersedes the tactical plan for this tick only.
    pub fn step(
        &mut self,
        inputs: &PlannerInputs,
        world: &WorldModel,
        _memory: &MemoryView,
    ) -> PlannerDecision {
        let mut decision = PlannerDecision::default();
        let now = inputs.tick;

        decision.completed_goals = self.sweep_completed(world);

        if inputs.milestone_changed || self.strategic_cadence.is_due(now) {
            self.recompute_frontier(now, world);
            decision.layer = Some(PlannerLayer::Strategic);
        }

        if let Some(action) = self.reactive_interrupt(inputs) {
            decision.action = Some(action);
            decision.layer = Some(PlannerLayer::Reactive);
            decision.goal_id = self.current_goal_id().map(String::from);
            return decision;
        }

        if let Some(plan) = &self.plan {
            if plan.is_expired(now) || plan.is_done() {
                self.plan = None;
                self.repairs_used = 0;
            }
        }
        let tactical_due = inputs.mode_changed
            || self.tactical_cadence.is_due(now)
            || decision.layer == Some(PlannerLayer::Strategic);
        if self.plan.is_none() && tactical_due {
            self.rebuild_plan(now, world);
            if decision.layer.is_none() {
                decision.layer = Some(PlannerLayer::Tactical);
            }
        }

        if let Some(plan) = &self.plan {
            decision.action = plan.current().cloned();
            decision.goal_id = Some(plan.goal_id().to_string());
        }
        decision
    }

    /// Feeds an action outcome back. Failure triggers local repair: up to
    /// `repair_attempts` alternative actions for the same goal, then the
    /// goal fails for the session and its dependents are re-scored.
    pub fn report_outcome(&mut self, tick: u64, outcome: ActionOutcome) -> PlannerDecision {
        let mut decision = PlannerDecision::default();
        let Some(goal_id) = self.current_goal_id().map(String::from) else {
            return decision;
        };

        match outcome {
            ActionOutcome::Success => {
                self.repairs_used = 0;
                let done = match self.plan.as_mut() {
                    Some(plan) => {
                        plan.advance(outcome);
                        plan.is_done()
                    }
                    None => false,
                };
                if done {
                    if let Some(goal) = self.graph.get_mut(&goal_id) {
                        goal.record_attempt(tick, true);
                    }
                    self.plan = None;
                }
            }
            ActionOutcome::Failure => {
                self.repairs_used += 1;
                if self.repairs_used <= self.config.repair_attempts {
                    let failed = self.plan.as_ref().and_then(|p| p.current().cloned());
                    let alt = self.alternative_action(&goal_id, failed.as_ref());
                    if let (Some(plan), Some(alt)) = (self.plan.as_mut(), alt) {
                        plan.replace_current(alt);
                    }
                } else {
                    if let Some(goal) = self.graph.get_mut(&goal_id) {
                        goal.record_attempt(tick, false);
                    }
                    let blocked = self.graph.mark_failed(&goal_id);
                    for dependent in blocked {
                        // Dependents keep their status but lose any hint bias.
                        self.set_priority_hint(&dependent, 0.0);
                    }
                    decision.failed_goal = Some(goal_id.clone());
                    self.plan = None;
                    self.repairs_used = 0;
                }
            }
        }
        decision.goal_id = Some(goal_id);
        decision
    }

    fn sweep_completed(&mut self, world: &WorldModel) -> Vec<String> {
        let newly_done: Vec<String> = self
            .graph
            .goals()
            .filter(|g| !g.is_terminal() && !g.success_when.is_empty())
            .filter(|g| world.satisfies_all(&g.success_when))
            .map(|g| g.id.clone())
            .collect();
        for id in &newly_done {
            self.graph.mark_completed(id);
            if self.current_goal_id() == Some(id.as_str()) {
                self.plan = None;
                self.repairs_used = 0;
            }
        }
        newly_done
    }

    fn recompute_frontier(&mut self, now: u64, world: &WorldModel) {
        let gamma = self.config.discount_gamma;
        let mut scored: Vec<(f64, String)> = self
            .graph
            .frontier(world)
            .into_iter()
            .map(|g| (utility(g, now, gamma), g.id.clone()))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(core::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        self.frontier = scored.into_iter().map(|(_, id)| id).collect();
    }

    fn reactive_interrupt(&self, inputs: &PlannerInputs) -> Option<AgentAction> {
        if let Some(hp) = inputs.hp_pct {
            if hp < self.config.critical_hp_pct {
                return AgentAction::new(ActionKind::Heal, 300).ok();
            }
        }
        if inputs.dialog_choice_pending {
            return AgentAction::new(ActionKind::Dialog { choice: Some(0) }, 60).ok();
        }
        if inputs.battle_started {
            let strategy = match inputs.hp_pct {
                Some(hp) if hp < 30 => BattleStrategy::Flee,
                _ => BattleStrategy::Aggressive,
            };
            return AgentAction::new(ActionKind::Battle { strategy }, 1200).ok();
        }
        None
    }

    fn rebuild_plan(&mut self, now: u64, world: &WorldModel) {
        if self.frontier.is_empty() {
            self.recompute_frontier(now, world);
        }
        let candidates = self
            .frontier
            .iter()
            .filter_map(|id| self.graph.get(id))
            .filter(|g| !g.is_terminal());
        let Some(goal_id) = best_goal_id(candidates, now, self.config.discount_gamma) else {
            self.plan = None;
            return;
        };
        let Some(goal) = self.graph.get(&goal_id) else {
            return;
        };
        let actions = decompose(goal, world);
        let expiry = now + self.config.plan_ttl_ticks;
        self.plan = Plan::new(goal_id, actions, expiry, now).ok();
        self.repairs_used = 0;
    }

    fn alternative_action(&self, goal_id: &str, failed: Option<&AgentAction>) -> Option<AgentAction> {
        let goal = self.graph.get(goal_id)?;
        let alt = match (&goal.category, failed.map(|a| &a.kind)) {
            // A failed move often just needs the obstruction dismissed.
            (_, Some(ActionKind::NavigateTo { .. })) => {
                AgentAction::new(ActionKind::Press { button: Button::B }, 30).ok()?
            }
            (GoalCategory::Battle, _) => AgentAction::new(
                ActionKind::Battle {
                    strategy: BattleStrategy::Conservative,
                },
                1200,
            )
            .ok()?,
            (_, Some(ActionKind::MenuSelect { .. })) => {
                AgentAction::new(ActionKind::Press { button: Button::B }, 30).ok()?
            }
            _ => AgentAction::wait(30),
        };
        Some(alt)
    }
}

/// Turns a goal into a concrete action sequence for its category.
fn decompose(goal: &Goal, world: &WorldModel) -> Vec<AgentAction> {
    let mut actions = Vec::new();
    match goal.category {
        GoalCategory::Navigation | GoalCategory::Milestone | GoalCategory::Battle => {
            if let Some(target) = target_location(goal) {
                if world.location != target {
                    if let Ok(action) =
                        AgentAction::new(ActionKind::NavigateTo { location: target }, 1800)
                    {
                        actions.push(action);
                    }
                }
            }
            if goal.category != GoalCategory::Navigation {
                if let Ok(action) = AgentAction::new(
                    ActionKind::Battle {
                        strategy: BattleStrategy::Aggressive,
                    },
                    2400,
                ) {
                    actions.push(action);
                }
            }
        }
        GoalCategory::Item => {
            for constraint in &goal.success_when {
                if let StateConstraint::HasItem(item) = constraint {
                    if let Ok(action) = AgentAction::new(
                        ActionKind::Shop {
                            item: item.clone(),
                            quantity: 1,
                        },
                        600,
                    ) {
                        actions.push(action);
                    }
                }
            }
        }
        GoalCategory::Maintenance => {
            if let Ok(action) = AgentAction::new(ActionKind::Heal, 600) {
                actions.push(action);
            }
        }
    }
    if actions.is_empty() {
        actions.push(AgentAction::wait(30));
    }
    actions
}

fn target_location(goal: &Goal) -> Option<String> {
    goal.required_state.iter().find_map(|c| match c {
        StateConstraint::AtLocation(loc) => Some(loc.clone()),
        _ => None,
    })
}
