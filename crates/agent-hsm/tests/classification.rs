use std::sync::{Arc, Mutex};

use agent_core::{Observation, ObservationFlags, ScreenKind};
use agent_hsm::{GameState, Hsm, HsmError, StatePath};

fn obs(tick: u64, kind: ScreenKind) -> Observation {
    Observation::new(tick, kind, [0u8; 16])
}

#[test]
fn ticks_must_strictly_increase() {
    let mut hsm = Hsm::new(Hsm::DEFAULT_AMBIGUITY_THRESHOLD);
    hsm.classify(&obs(5, ScreenKind::Overworld)).unwrap();
    let err = hsm.classify(&obs(5, ScreenKind::Overworld)).unwrap_err();
    assert_eq!(err, HsmError::NonMonotonicTick { prev: 5, got: 5 });
}

#[test]
fn press_start_screen_classifies_with_high_confidence() {
    let mut hsm = Hsm::new(Hsm::DEFAULT_AMBIGUITY_THRESHOLD);
    let c = hsm
        .classify(&obs(1, ScreenKind::Title).with_ocr_text("PUSH START"))
        .unwrap();
    assert_eq!(c.path.leaf(), GameState::PressStart);
    assert!(c.confidence > 0.9);
    assert!(!c.ambiguous);
    assert_eq!(c.path.to_string(), "TITLE.PRESS_START");
}

#[test]
fn illegal_transition_degrades_to_ambiguous() {
    let mut hsm = Hsm::new(Hsm::DEFAULT_AMBIGUITY_THRESHOLD);
    hsm.classify(&obs(1, ScreenKind::Overworld)).unwrap();

    // Battle command menu without an intro is not a legal edge from idle.
    let battle = obs(2, ScreenKind::Battle)
        .with_ocr_text("FIGHT PKMN ITEM RUN")
        .with_flags(ObservationFlags::CURSOR_VISIBLE);
    let c = hsm.classify(&battle).unwrap();
    assert!(c.ambiguous);
    assert_eq!(c.path.leaf(), GameState::TransitionAmbiguous);
    assert!(c.confidence < 0.5);
}

#[test]
fn three_low_confidence_ticks_escalate_to_emergency() {
    let mut hsm = Hsm::new(Hsm::DEFAULT_AMBIGUITY_THRESHOLD);
    hsm.classify(&obs(1, ScreenKind::Overworld)).unwrap();

    let mut last = None;
    for tick in 2..=4 {
        last = Some(hsm.classify(&obs(tick, ScreenKind::Unknown)).unwrap());
    }
    assert_eq!(last.unwrap().path.leaf(), GameState::AmbiguousState);
}

#[test]
fn transition_events_are_delivered_on_flush() {
    let mut hsm = Hsm::new(Hsm::DEFAULT_AMBIGUITY_THRESHOLD);
    let seen: Arc<Mutex<Vec<(Option<StatePath>, StatePath)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    hsm.on_transition(move |ev| {
        sink.lock().unwrap().push((ev.from, ev.to));
    });

    hsm.classify(&obs(1, ScreenKind::Overworld)).unwrap();
    hsm.classify(&obs(2, ScreenKind::Overworld)).unwrap();
    let dialog = obs(3, ScreenKind::Dialog).with_ocr_text("Hello!");
    hsm.classify(&dialog).unwrap();

    // Nothing delivered mid-tick.
    assert!(seen.lock().unwrap().is_empty());
    hsm.flush_events();

    let events = seen.lock().unwrap();
    // Initial entry plus the overworld->dialog edge; the repeated idle tick
    // produces no event.
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, None);
    assert_eq!(events[1].1.leaf(), GameState::SystemText);
}

#[test]
fn paths_expose_group_depth() {
    let mut hsm = Hsm::new(Hsm::DEFAULT_AMBIGUITY_THRESHOLD);
    hsm.classify(&obs(1, ScreenKind::Overworld)).unwrap();
    hsm.classify(&obs(2, ScreenKind::Battle).with_flags(ObservationFlags::BATTLE_INTRO))
        .unwrap();
    let c = hsm
        .classify(
            &obs(3, ScreenKind::Battle)
                .with_ocr_text("FIGHT")
                .with_flags(ObservationFlags::CURSOR_VISIBLE),
        )
        .unwrap();
    assert_eq!(c.path.depth(), 3);
    assert_eq!(c.path.to_string(), "BATTLE.COMMAND.COMMAND_MENU");
}
