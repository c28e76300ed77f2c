use crate::goal::Goal;

/// Ticks per unit of temporal discount.
const DISCOUNT_WINDOW_TICKS: f64 = 100.0;

/// Scores a goal at tick `now`.
///
/// `U = priority · γ^((now - last_attempt)/100) · (0.5 + 0.5·success) · (1 + modifier)`
///
/// A goal that has never been attempted carries no staleness discount.
/// Non-finite scores collapse to zero.
pub fn utility(goal: &Goal, now: u64, gamma: f64) -> f64 {
    let staleness = match goal.last_attempt_tick {
        Some(last) => now.saturating_sub(last) as f64 / DISCOUNT_WINDOW_TICKS,
        None => 0.0,
    };
    let discount = gamma.powf(staleness);
    let success_factor = 0.5 + 0.5 * goal.success.mean();
    let modifier = 1.0 + goal.priority_modifier as f64;

    let u = goal.base_priority as f64 * discount * success_factor * modifier;
    if u.is_finite() {
        u
    } else {
        0.0
    }
}

/// Picks the highest-utility goal id from `candidates`, tie-broken by id for
/// determinism.
pub fn best_goal_id<'a>(
    candidates: impl Iterator<Item = &'a Goal>,
    now: u64,
    gamma: f64,
) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for goal in candidates {
        let score = utility(goal, now, gamma);
        let better = match best {
            None => true,
            Some((best_score, best_id)) => {
                score > best_score || (score == best_score && goal.id.as_str() < best_id)
            }
        };
        if better {
            best = Some((score, goal.id.as_str()));
        }
    }
    best.map(|(_, id)| id.to_string())
}
