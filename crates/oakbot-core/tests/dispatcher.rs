use agent_core::{ActionKind, AgentAction, BattleStrategy, Button};
use agent_hsm::{GameState, StatePath};
use oakbot_core::{ButtonDispatcher, DispatchOutcome, ScriptedEmulator};

fn dispatcher() -> ButtonDispatcher {
    ButtonDispatcher::new(ButtonDispatcher::DEFAULT_COOLDOWN_MS)
}

#[test]
fn press_action_emits_one_tap() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    let action = AgentAction::press(Button::A);
    let outcome = d.dispatch(&action, None, &mut emu);
    assert_eq!(outcome, DispatchOutcome::Emitted { presses: 1 });
    assert_eq!(emu.press_count(Button::A), 1);
}

#[test]
fn wait_emits_nothing() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    let outcome = d.dispatch(&AgentAction::wait(10), None, &mut emu);
    assert_eq!(outcome, DispatchOutcome::Idle);
    assert!(emu.presses().is_empty());
}

#[test]
fn dialog_choice_scrolls_then_confirms() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    let action = AgentAction::new(ActionKind::Dialog { choice: Some(2) }, 60).unwrap();
    d.dispatch(&action, None, &mut emu);
    let buttons: Vec<Button> = emu.presses().iter().map(|(_, b, _)| *b).collect();
    assert_eq!(buttons, vec![Button::Down, Button::Down, Button::A]);
}

#[test]
fn navigate_cycles_directions_across_dispatches() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    let action = AgentAction::new(
        ActionKind::NavigateTo {
            location: "pewter_city".into(),
        },
        600,
    )
    .unwrap();
    for _ in 0..4 {
        d.dispatch(&action, None, &mut emu);
    }
    let buttons: Vec<Button> = emu.presses().iter().map(|(_, b, _)| *b).collect();
    assert_eq!(
        buttons,
        vec![Button::Up, Button::Left, Button::Down, Button::Right]
    );
}

#[test]
fn flee_navigates_to_run_in_the_command_menu() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    let action = AgentAction::new(
        ActionKind::Battle {
            strategy: BattleStrategy::Flee,
        },
        600,
    )
    .unwrap();
    d.dispatch(&action, Some(StatePath::new(GameState::CommandMenu)), &mut emu);
    let buttons: Vec<Button> = emu.presses().iter().map(|(_, b, _)| *b).collect();
    assert_eq!(buttons, vec![Button::Down, Button::Right, Button::A]);
}

#[test]
fn battle_outside_command_menu_just_advances_text() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    let action = AgentAction::new(
        ActionKind::Battle {
            strategy: BattleStrategy::Aggressive,
        },
        600,
    )
    .unwrap();
    d.dispatch(&action, Some(StatePath::new(GameState::NpcText)), &mut emu);
    assert_eq!(emu.press_count(Button::A), 1);
}

#[test]
fn rejection_surfaces_as_failed_without_retry() {
    let mut d = dispatcher();
    let mut emu = ScriptedEmulator::new();
    emu.set_reject_presses(true);
    let outcome = d.dispatch(&AgentAction::press(Button::A), None, &mut emu);
    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    assert!(emu.presses().is_empty());
}

#[test]
fn opposing_dpad_chords_are_disallowed() {
    assert!(!ButtonDispatcher::chord_allowed(Button::Up, Button::Down));
    assert!(!ButtonDispatcher::chord_allowed(Button::Left, Button::Right));
    assert!(ButtonDispatcher::chord_allowed(Button::Up, Button::Left));
    assert!(ButtonDispatcher::chord_allowed(Button::A, Button::B));
}
