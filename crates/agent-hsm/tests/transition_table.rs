use agent_hsm::{Category, GameState, TransitionTable};

#[test]
fn all_states_have_dense_indices() {
    assert_eq!(GameState::ALL.len(), GameState::COUNT);
    for (i, state) in GameState::ALL.iter().enumerate() {
        assert_eq!(state.index(), i);
    }
}

#[test]
fn category_sizes() {
    let count = |cat: Category| {
        GameState::ALL
            .iter()
            .filter(|s| s.category() == cat)
            .count()
    };
    assert_eq!(count(Category::Boot), 4);
    assert_eq!(count(Category::Title), 5);
    assert_eq!(count(Category::Menu), 16);
    assert_eq!(count(Category::Dialog), 7);
    assert_eq!(count(Category::Overworld), 8);
    assert_eq!(count(Category::Battle), 20);
    assert_eq!(count(Category::Emergency), 5);
    assert_eq!(count(Category::Transition), 6);
}

#[test]
fn battle_entry_requires_an_intro_state() {
    let table = TransitionTable::new();
    assert!(table.legal(GameState::Walking, GameState::WildIntro));
    assert!(table.legal(GameState::NpcText, GameState::TrainerIntro));
    assert!(!table.legal(GameState::Walking, GameState::CommandMenu));
    assert!(!table.legal(GameState::Idle, GameState::AttackAnimation));
}

#[test]
fn battle_exit_goes_through_battle_over() {
    let table = TransitionTable::new();
    assert!(table.legal(GameState::BattleOver, GameState::Idle));
    assert!(!table.legal(GameState::CommandMenu, GameState::Idle));
    // Mid-battle, intros cannot recur.
    assert!(!table.legal(GameState::CommandMenu, GameState::WildIntro));
    assert!(table.legal(GameState::WildIntro, GameState::CommandMenu));
}

#[test]
fn emergency_is_enterable_from_anywhere() {
    let table = TransitionTable::new();
    for state in GameState::ALL {
        assert!(
            table.legal(state, GameState::SoftlockDetected),
            "{} cannot enter emergency",
            state.id()
        );
    }
    // Exit only to safe targets.
    assert!(table.legal(GameState::HardResetPending, GameState::Initialize));
    assert!(table.legal(GameState::RecoveryPending, GameState::Idle));
    assert!(!table.legal(GameState::RecoveryPending, GameState::CommandMenu));
}

#[test]
fn boot_reaches_title_only_at_press_start() {
    let table = TransitionTable::new();
    assert!(table.legal(GameState::OakSpeech, GameState::PressStart));
    assert!(!table.legal(GameState::OakSpeech, GameState::TitleMenu));
}

#[test]
fn stable_ids_are_unique() {
    let mut ids: Vec<&str> = GameState::ALL.iter().map(|s| s.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), GameState::COUNT);
}
