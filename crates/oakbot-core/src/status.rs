//! Control-surface status snapshot.

use serde::Serialize;

use crate::events::FailsafeEvent;

/// Point-in-time agent status for the control surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStatus {
    pub tick_id: u64,
    pub mode: Option<String>,
    pub state_path: Option<String>,
    pub current_goal: Option<String>,
    pub confidence: f32,
    pub degraded: bool,
    pub last_event: Option<FailsafeEvent>,
}
