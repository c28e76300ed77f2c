use agent_core::{ActionError, ActionKind, AgentAction, BattleStrategy, Button, Cadence};

#[test]
fn zero_timeout_is_rejected() {
    let err = AgentAction::new(ActionKind::Heal, 0).unwrap_err();
    assert_eq!(err, ActionError::ZeroTimeout);
}

#[test]
fn menu_select_requires_a_path() {
    let err = AgentAction::new(ActionKind::MenuSelect { labels: vec![] }, 10).unwrap_err();
    assert_eq!(err, ActionError::EmptyMenuPath);

    let ok = AgentAction::new(
        ActionKind::MenuSelect {
            labels: vec!["POKEMON".into()],
        },
        10,
    );
    assert!(ok.is_ok());
}

#[test]
fn shop_requires_quantity() {
    let err = AgentAction::new(
        ActionKind::Shop {
            item: "POTION".into(),
            quantity: 0,
        },
        10,
    )
    .unwrap_err();
    assert_eq!(err, ActionError::ZeroQuantity);
}

#[test]
fn movement_kinds_are_flagged() {
    assert!(AgentAction::press(Button::Up).kind.is_movement());
    assert!(!AgentAction::press(Button::A).kind.is_movement());
    let nav = AgentAction::new(
        ActionKind::NavigateTo {
            location: "viridian_city".into(),
        },
        600,
    )
    .unwrap();
    assert!(nav.kind.is_movement());
    assert!(!AgentAction::new(ActionKind::Battle { strategy: BattleStrategy::Aggressive }, 100)
        .unwrap()
        .kind
        .is_movement());
}

#[test]
fn cadence_fires_on_interval_with_offset() {
    let plain = Cadence::every(30);
    assert!(plain.is_due(0));
    assert!(!plain.is_due(1));
    assert!(plain.is_due(30));

    let offset = Cadence::every(30).with_offset(7);
    assert!(offset.is_due(23));
    assert!(!offset.is_due(30));
    assert!(offset.is_due(53));
}
