use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::goal::{StateConstraint, StateEffect};

/// The planner's view of game progress.
///
/// The kernel rebuilds this from emulator memory each tick; the planner only
/// ever reads it and applies goal effects when a goal completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldModel {
    pub badges: BTreeSet<String>,
    pub location: String,
    pub max_party_level: u8,
    pub money: u32,
    pub items: BTreeMap<String, u8>,
    pub party_hp_pct: u8,
}

impl WorldModel {
    pub fn satisfies(&self, constraint: &StateConstraint) -> bool {
        match constraint {
            StateConstraint::HasBadge(badge) => self.badges.contains(badge),
            StateConstraint::AtLocation(location) => &self.location == location,
            StateConstraint::MinLevel(level) => self.max_party_level >= *level,
            StateConstraint::MinMoney(money) => self.money >= *money,
            StateConstraint::HasItem(item) => {
                self.items.get(item).copied().unwrap_or(0) > 0
            }
            StateConstraint::PartyHealthyAbove(pct) => self.party_hp_pct > *pct,
        }
    }

    pub fn satisfies_all(&self, constraints: &[StateConstraint]) -> bool {
        constraints.iter().all(|c| self.satisfies(c))
    }

    pub fn apply(&mut self, effect: &StateEffect) {
        match effect {
            StateEffect::GrantBadge(badge) => {
                self.badges.insert(badge.clone());
            }
            StateEffect::MoveTo(location) => {
                self.location = location.clone();
            }
            StateEffect::AddItem(item, count) => {
                *self.items.entry(item.clone()).or_insert(0) += count;
            }
        }
    }

    pub fn apply_all(&mut self, effects: &[StateEffect]) {
        for effect in effects {
            self.apply(effect);
        }
    }
}
