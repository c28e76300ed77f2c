use core::str::FromStr;

use agent_core::{Mode, ModeKey, SubMode};

#[test]
fn sub_mode_parent_is_enforced() {
    assert!(ModeKey::new(Mode::Battle, SubMode::BattleMenu).is_some());
    assert!(ModeKey::new(Mode::Overworld, SubMode::BattleMenu).is_none());
    assert!(ModeKey::new(Mode::Menu, SubMode::Text).is_none());
}

#[test]
fn of_derives_the_parent() {
    let key = ModeKey::of(SubMode::Shop);
    assert_eq!(key.mode(), Mode::Menu);
    assert_eq!(key.sub_mode(), SubMode::Shop);
}

#[test]
fn display_and_parse_round_trip() {
    for sub in [
        SubMode::Startup,
        SubMode::PressStart,
        SubMode::Shop,
        SubMode::Choice,
        SubMode::Moving,
        SubMode::BattleCatch,
    ] {
        let key = ModeKey::of(sub);
        let parsed = ModeKey::from_str(&key.to_string()).unwrap();
        assert_eq!(parsed, key);
    }
}

#[test]
fn parse_rejects_mismatched_parent() {
    assert!(ModeKey::from_str("overworld.battle_menu").is_err());
    assert!(ModeKey::from_str("battle").is_err());
    assert!(ModeKey::from_str("battle.nope").is_err());
}
