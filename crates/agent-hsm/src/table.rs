use crate::state::{Category, GameState, StateGroup};

/// Authoritative legal-transition table.
///
/// One `u128` bitset row per source state; bit `j` set means the edge into
/// state index `j` is legal. Rows are built once from the rule set below.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rows: [u128; GameState::COUNT],
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionTable {
    pub fn new() -> Self {
        let mut rows = [0u128; GameState::COUNT];
        for from in GameState::ALL {
            let mut row = 0u128;
            for to in GameState::ALL {
                if edge_legal(from, to) {
                    row |= 1u128 << to.index();
                }
            }
            rows[from.index()] = row;
        }
        Self { rows }
    }

    pub fn legal(&self, prev: GameState, next: GameState) -> bool {
        (self.rows[prev.index()] >> next.index()) & 1 == 1
    }
}

fn edge_legal(from: GameState, to: GameState) -> bool {
    use Category::*;

    if from == to {
        return true;
    }

    let (fc, tc) = (from.category(), to.category());

    // Emergency entry is legal from any state; exit only to safe targets.
    if tc == Emergency {
        return true;
    }
    if fc == Emergency {
        return matches!(tc, Boot | Title | Transition)
            || to == GameState::Idle
            || to == GameState::StartMenu;
    }

    // Transitions may begin anywhere; where they land is constrained.
    if tc == Transition {
        return true;
    }
    if fc == Transition {
        return match from {
            // A battle swirl resolves only into an intro state.
            GameState::BattleEnter => to.group() == Some(StateGroup::BattleIntro),
            GameState::BattleExit => matches!(tc, Overworld | Dialog),
            GameState::MapLoad | GameState::FadeIn => {
                matches!(tc, Overworld | Menu | Dialog | Title | Boot)
            }
            GameState::FadeOut => matches!(tc, Overworld | Menu | Dialog | Title | Boot),
            GameState::TransitionAmbiguous => true,
            _ => false,
        };
    }

    // Within one category, most edges are legal; battle intros are the
    // exception: they cannot be re-entered mid-battle.
    if fc == tc {
        if tc == Battle && to.group() == Some(StateGroup::BattleIntro) {
            return from.group() == Some(StateGroup::BattleIntro);
        }
        return true;
    }

    // Cross-category edges.
    match (fc, tc) {
        (Boot, Title) => to == GameState::PressStart,
        (Title, Overworld) => to == GameState::Idle,
        (Title, Dialog) => true, // new-game naming prompts
        (Overworld, Menu) => to == GameState::StartMenu,
        (Menu, Overworld) => true,
        (Overworld, Dialog) | (Dialog, Overworld) => true,
        (Dialog, Menu) | (Menu, Dialog) => true,
        (Overworld, Battle) | (Dialog, Battle) => to.group() == Some(StateGroup::BattleIntro),
        (Battle, Overworld) => from == GameState::BattleOver,
        (Battle, Dialog) => from == GameState::BattleOver,
        _ => false,
    }
}
