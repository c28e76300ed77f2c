use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use agent_core::ModeKey;

use crate::state::{Category, GameState, StateGroup};

/// Root-to-leaf path through the state hierarchy.
///
/// Always non-empty; the category and optional group are derived from the
/// leaf, so a path can never be internally inconsistent. Depth is two or
/// three nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatePath {
    leaf: GameState,
}

impl StatePath {
    pub fn new(leaf: GameState) -> Self {
        Self { leaf }
    }

    pub fn leaf(self) -> GameState {
        self.leaf
    }

    pub fn category(self) -> Category {
        self.leaf.category()
    }

    pub fn group(self) -> Option<StateGroup> {
        self.leaf.group()
    }

    pub fn depth(self) -> usize {
        match self.group() {
            Some(_) => 3,
            None => 2,
        }
    }

    pub fn mode_key(self) -> Option<ModeKey> {
        self.leaf.mode_key()
    }

    pub fn is_emergency(self) -> bool {
        self.category() == Category::Emergency
    }

    pub fn is_transition(self) -> bool {
        self.category() == Category::Transition
    }

    /// Detects the edge between two consecutive ticks' paths.
    pub fn changed_from(self, prev: Option<StatePath>) -> bool {
        prev.map(|p| p.leaf != self.leaf).unwrap_or(true)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group() {
            Some(group) => write!(
                f,
                "{}.{}.{}",
                self.category().label(),
                group.label(),
                leaf_segment(self.leaf.id())
            ),
            None => write!(f, "{}", self.leaf.id()),
        }
    }
}

fn leaf_segment(id: &str) -> &str {
    id.split_once('.').map(|(_, rest)| rest).unwrap_or(id)
}
