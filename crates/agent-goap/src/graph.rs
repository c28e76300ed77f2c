use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::goal::{Goal, GoalStatus};
use crate::world::WorldModel;

#[derive(Debug, Error)]
pub enum GoalGraphError {
    #[error("goal `{goal}` names unknown prerequisite `{prereq}`")]
    UnknownPrereq { goal: String, prereq: String },
    #[error("goal graph contains a prerequisite cycle through `{0}`")]
    Cycle(String),
    #[error("duplicate goal id `{0}`")]
    Duplicate(String),
}

/// Owning registry of all goals, keyed by stable string id.
///
/// Acyclicity is checked at construction and re-checked after any mutation
/// that touches edges.
#[derive(Debug, Default, Clone)]
pub struct GoalGraph {
    goals: HashMap<String, Goal>,
    completed: HashSet<String>,
}

impl GoalGraph {
    pub fn from_goals(goals: Vec<Goal>) -> Result<Self, GoalGraphError> {
        let mut graph = Self::default();
        for goal in goals {
            if graph.goals.contains_key(&goal.id) {
                return Err(GoalGraphError::Duplicate(goal.id));
            }
            if goal.status == GoalStatus::Completed {
                graph.completed.insert(goal.id.clone());
            }
            graph.goals.insert(goal.id.clone(), goal);
        }
        graph.validate()?;
        Ok(graph)
    }

    pub fn insert(&mut self, goal: Goal) -> Result<(), GoalGraphError> {
        if self.goals.contains_key(&goal.id) {
            return Err(GoalGraphError::Duplicate(goal.id));
        }
        self.goals.insert(goal.id.clone(), goal);
        self.validate()
    }

    /// Checks prerequisite references and acyclicity.
    pub fn validate(&self) -> Result<(), GoalGraphError> {
        for goal in self.goals.values() {
            for prereq in &goal.prereqs {
                if !self.goals.contains_key(prereq) {
                    return Err(GoalGraphError::UnknownPrereq {
                        goal: goal.id.clone(),
                        prereq: prereq.clone(),
                    });
                }
            }
        }

        // Iterative DFS with a three-color marking.
        let mut state: HashMap<&str, u8> = HashMap::new();
        for start in self.goals.keys() {
            if state.get(start.as_str()).copied().unwrap_or(0) != 0 {
                continue;
            }
            let mut stack: Vec<(&str, bool)> = vec![(start.as_str(), false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    state.insert(id, 2);
                    continue;
                }
                match state.get(id).copied().unwrap_or(0) {
                    1 => return Err(GoalGraphError::Cycle(id.to_string())),
                    2 => continue,
                    _ => {}
                }
                state.insert(id, 1);
                stack.push((id, true));
                if let Some(goal) = self.goals.get(id) {
                    for prereq in &goal.prereqs {
                        match state.get(prereq.as_str()).copied().unwrap_or(0) {
                            1 => return Err(GoalGraphError::Cycle(prereq.clone())),
                            2 => {}
                            _ => stack.push((prereq.as_str(), false)),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.goals.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Goal> {
        self.goals.get_mut(id)
    }

    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    pub fn completed_ids(&self) -> &HashSet<String> {
        &self.completed
    }

    /// Achievable goals: prerequisites completed, required state satisfied,
    /// and not already terminal.
    pub fn frontier(&self, world: &WorldModel) -> Vec<&Goal> {
        let mut ready: Vec<&Goal> = self
            .goals
            .values()
            .filter(|g| !g.is_terminal())
            .filter(|g| g.prereqs.iter().all(|p| self.completed.contains(p)))
            .filter(|g| world.satisfies_all(&g.required_state))
            .collect();
        ready.sort_by(|a, b| a.id.cmp(&b.id));
        ready
    }

    pub fn mark_completed(&mut self, id: &str) {
        if let Some(goal) = self.goals.get_mut(id) {
            goal.status = GoalStatus::Completed;
        }
        self.completed.insert(id.to_string());
    }

    /// Fails a goal for the session. Returns the ids of now-unreachable
    /// dependents (goals whose prerequisite chain includes the failure).
    pub fn mark_failed(&mut self, id: &str) -> Vec<String> {
        if let Some(goal) = self.goals.get_mut(id) {
            goal.status = GoalStatus::Failed;
        }
        let mut blocked = Vec::new();
        for goal in self.goals.values() {
            if goal.is_terminal() {
                continue;
            }
            if self.depends_on(&goal.id, id) {
                blocked.push(goal.id.clone());
            }
        }
        blocked.sort();
        blocked
    }

    fn depends_on(&self, goal_id: &str, target: &str) -> bool {
        let mut stack: Vec<&str> = vec![goal_id];
        let mut seen: HashSet<&str> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(goal) = self.goals.get(id) else {
                continue;
            };
            for prereq in &goal.prereqs {
                if prereq == target {
                    return true;
                }
                stack.push(prereq.as_str());
            }
        }
        false
    }

    /// Invariant check: every completed goal's prerequisites are completed.
    pub fn completion_is_consistent(&self) -> bool {
        self.completed.iter().all(|id| {
            self.goals
                .get(id)
                .map(|g| g.prereqs.iter().all(|p| self.completed.contains(p)))
                .unwrap_or(true)
        })
    }
}
