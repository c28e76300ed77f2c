use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Button;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BattleStrategy {
    Aggressive,
    Conservative,
    Catch,
    Flee,
}

/// Closed set of planner-emitted actions.
///
/// Each kind carries exactly the parameters its dispatcher translation needs;
/// there is deliberately no open key-value parameter bag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ActionKind {
    NavigateTo { location: String },
    Battle { strategy: BattleStrategy },
    MenuSelect { labels: Vec<String> },
    Dialog { choice: Option<u8> },
    Press { button: Button },
    Shop { item: String, quantity: u8 },
    Heal,
    Wait { ticks: u32 },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::NavigateTo { .. } => "navigate_to",
            ActionKind::Battle { .. } => "battle",
            ActionKind::MenuSelect { .. } => "menu_select",
            ActionKind::Dialog { .. } => "dialog",
            ActionKind::Press { .. } => "press",
            ActionKind::Shop { .. } => "shop",
            ActionKind::Heal => "heal",
            ActionKind::Wait { .. } => "wait",
        }
    }

    /// True for kinds whose dispatch emits d-pad movement.
    pub fn is_movement(&self) -> bool {
        matches!(
            self,
            ActionKind::NavigateTo { .. }
                | ActionKind::Press {
                    button: Button::Up | Button::Down | Button::Left | Button::Right,
                }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    ZeroTimeout,
    EmptyMenuPath,
    ZeroQuantity,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::ZeroTimeout => write!(f, "action timeout_ticks must be > 0"),
            ActionError::EmptyMenuPath => write!(f, "menu_select requires at least one label"),
            ActionError::ZeroQuantity => write!(f, "shop quantity must be > 0"),
        }
    }
}

impl std::error::Error for ActionError {}

/// A validated action with its per-kind parameters and timeout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentAction {
    pub kind: ActionKind,
    pub timeout_ticks: u32,
}

impl AgentAction {
    pub fn new(kind: ActionKind, timeout_ticks: u32) -> Result<Self, ActionError> {
        if timeout_ticks == 0 {
            return Err(ActionError::ZeroTimeout);
        }
        match &kind {
            ActionKind::MenuSelect { labels } if labels.is_empty() => {
                return Err(ActionError::EmptyMenuPath)
            }
            ActionKind::Shop { quantity, .. } if *quantity == 0 => {
                return Err(ActionError::ZeroQuantity)
            }
            _ => {}
        }
        Ok(Self {
            kind,
            timeout_ticks,
        })
    }

    pub fn press(button: Button) -> Self {
        Self {
            kind: ActionKind::Press { button },
            timeout_ticks: 30,
        }
    }

    pub fn wait(ticks: u32) -> Self {
        Self {
            kind: ActionKind::Wait { ticks: ticks.max(1) },
            timeout_ticks: ticks.max(1) + 1,
        }
    }
}
