//! Translates planned actions into timed button sequences.

use agent_core::{ActionKind, AgentAction, BattleStrategy, Button, ButtonPress};
use agent_hsm::{Category, StatePath};

use crate::emulator::{EmulatorError, EmulatorPort};

/// Result of one dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// All presses delivered.
    Emitted { presses: usize },
    /// Nothing to press this tick (waits, empty translations).
    Idle,
    /// The emulator refused a press; the planner hears about it.
    Failed { reason: String },
}

/// Stateless translation plus per-button cooldown bookkeeping.
///
/// No retries here: a rejected press surfaces as a failed action and the
/// planner decides what to do.
pub struct ButtonDispatcher {
    cooldown_ms: u16,
    nav_cycle: usize,
    /// Virtual clock over emitted press timings, per button.
    last_press_ms: [u64; 8],
    clock_ms: u64,
}

const NAV_CYCLE: [Button; 4] = [Button::Up, Button::Left, Button::Down, Button::Right];

impl ButtonDispatcher {
    pub const DEFAULT_COOLDOWN_MS: u16 = 50;

    pub fn new(cooldown_ms: u16) -> Self {
        Self {
            cooldown_ms,
            nav_cycle: 0,
            last_press_ms: [0; 8],
            clock_ms: 0,
        }
    }

    /// Two buttons that may never be held together.
    pub fn chord_allowed(a: Button, b: Button) -> bool {
        a.opposite() != Some(b)
    }

    /// Translates an action into its press sequence for this tick.
    pub fn translate(&mut self, action: &AgentAction, path: Option<StatePath>) -> Vec<ButtonPress> {
        match &action.kind {
            ActionKind::Press { button } => vec![ButtonPress::tap(*button)],
            ActionKind::Wait { .. } => Vec::new(),
            ActionKind::Dialog { choice } => {
                let mut presses = Vec::new();
                if let Some(choice) = choice {
                    for _ in 0..*choice {
                        presses.push(ButtonPress::tap(Button::Down));
                    }
                }
                presses.push(ButtonPress::tap(Button::A));
                presses
            }
            ActionKind::MenuSelect { labels } => {
                // One confirm per menu level; cursor movement is handled by
                // the per-level reselection on later ticks.
                labels.iter().map(|_| ButtonPress::tap(Button::A)).collect()
            }
            ActionKind::NavigateTo { .. } => {
                let button = NAV_CYCLE[self.nav_cycle % NAV_CYCLE.len()];
                self.nav_cycle += 1;
                vec![ButtonPress::new(button, 120, 60)]
            }
            ActionKind::Battle { strategy } => battle_presses(*strategy, path),
            ActionKind::Shop { quantity, .. } => {
                let mut presses = vec![ButtonPress::tap(Button::A)];
                for _ in 1..*quantity {
                    presses.push(ButtonPress::tap(Button::Up));
                }
                presses.push(ButtonPress::tap(Button::A));
                presses
            }
            ActionKind::Heal => vec![ButtonPress::tap(Button::A)],
        }
    }

    /// Emits a press sequence through the port, honoring cooldowns.
    pub fn emit(
        &mut self,
        presses: &[ButtonPress],
        port: &mut dyn EmulatorPort,
    ) -> DispatchOutcome {
        if presses.is_empty() {
            return DispatchOutcome::Idle;
        }
        let mut emitted = 0usize;
        for press in presses {
            let idx = button_index(press.button);
            let earliest = self.last_press_ms[idx] + self.cooldown_ms as u64;
            if self.clock_ms < earliest {
                self.clock_ms = earliest;
            }
            match port.press(press.button, press.hold_ms) {
                Ok(()) => {
                    emitted += 1;
                    self.clock_ms += press.hold_ms as u64 + press.post_delay_ms as u64;
                    self.last_press_ms[idx] = self.clock_ms;
                }
                Err(EmulatorError::ButtonRejected(reason)) => {
                    return DispatchOutcome::Failed { reason };
                }
                Err(other) => {
                    return DispatchOutcome::Failed {
                        reason: other.to_string(),
                    };
                }
            }
        }
        DispatchOutcome::Emitted { presses: emitted }
    }

    /// Translate-and-emit in one step.
    pub fn dispatch(
        &mut self,
        action: &AgentAction,
        path: Option<StatePath>,
        port: &mut dyn EmulatorPort,
    ) -> DispatchOutcome {
        let presses = self.translate(action, path);
        self.emit(&presses, port)
    }
}

fn battle_presses(strategy: BattleStrategy, path: Option<StatePath>) -> Vec<ButtonPress> {
    let in_command_menu = path
        .map(|p| p.category() == Category::Battle)
        .unwrap_or(false);
    if !in_command_menu {
        // Advance intro/text until the command menu shows.
        return vec![ButtonPress::tap(Button::A)];
    }
    match strategy {
        BattleStrategy::Aggressive | BattleStrategy::Conservative => {
            vec![ButtonPress::tap(Button::A), ButtonPress::tap(Button::A)]
        }
        BattleStrategy::Catch => vec![
            ButtonPress::tap(Button::Down),
            ButtonPress::tap(Button::Left),
            ButtonPress::tap(Button::A),
        ],
        BattleStrategy::Flee => vec![
            ButtonPress::tap(Button::Down),
            ButtonPress::tap(Button::Right),
            ButtonPress::tap(Button::A),
        ],
    }
}

fn button_index(button: Button) -> usize {
    Button::ALL.iter().position(|b| *b == button).unwrap_or(0)
}
