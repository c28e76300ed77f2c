//! Advisory decision oracle boundary.

use agent_core::AgentAction;
use agent_hsm::StatePath;
use agent_memory::MemoryView;

/// External decision oracle. Purely advisory: the planner may take the hint
/// or ignore it; the confidence feeds the failsafe aggregate.
pub trait DecisionOracle: Send {
    fn propose(
        &mut self,
        path: StatePath,
        memory: &MemoryView,
        current_goal: Option<&str>,
    ) -> Option<(AgentAction, f32)>;
}

/// The default oracle: never proposes, scores full confidence.
#[derive(Debug, Default)]
pub struct NullOracle;

impl DecisionOracle for NullOracle {
    fn propose(
        &mut self,
        _path: StatePath,
        _memory: &MemoryView,
        _current_goal: Option<&str>,
    ) -> Option<(AgentAction, f32)> {
        None
    }
}
