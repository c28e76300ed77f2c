use agent_core::{Button, ModeKey, SubMode};
use agent_hsm::{GameState, StatePath};
use oakbot_core::config::{AnomalySection, BreakoutSection};
use oakbot_core::profile::DurationProfile;
use oakbot_core::{Alarm, AnomalyDetector, BreakoutManager, BreakoutStep, BreakoutTier};

fn warm_profile(mean_ms: f64, samples: u64) -> DurationProfile {
    let mut profile = DurationProfile::default();
    for _ in 0..samples {
        profile.update(mean_ms, 0.3);
    }
    profile
}

#[test]
fn cold_profile_never_alarms() {
    let detector = AnomalyDetector::new(AnomalySection::default());
    let reading = detector.check(1_000_000, None);
    assert_eq!(reading.alarm, Alarm::None);
}

#[test]
fn alarm_grades_scale_with_dwell() {
    let detector = AnomalyDetector::new(AnomalySection::default());
    // Battle menu profile: mean 50 ticks at 33ms.
    let profile = warm_profile(50.0 * 33.0, 40);

    assert_eq!(detector.check(1650, Some(&profile)).alarm, Alarm::None);

    // 500-tick dwell is far beyond both the z and ratio thresholds.
    let critical = detector.check(500 * 33, Some(&profile));
    assert_eq!(critical.alarm, Alarm::Critical);
    assert!(critical.p95_ratio >= 2.0);
}

#[test]
fn ratio_threshold_warns_before_critical() {
    let detector = AnomalyDetector::new(AnomalySection::default());
    let mut profile = DurationProfile::default();
    // Noisy stream keeps the variance wide so the ratio path decides.
    for i in 0..60 {
        profile.update(1000.0 + (i % 7) as f64 * 400.0, 0.3);
    }
    let p95 = profile.p95_ms;

    let warn = detector.check((p95 * 1.6) as u64, Some(&profile));
    assert!(warn.alarm >= Alarm::Warn);
    let critical = detector.check((p95 * 2.1) as u64, Some(&profile));
    assert_eq!(critical.alarm, Alarm::Critical);
}

fn battle_key() -> ModeKey {
    ModeKey::of(SubMode::BattleMenu)
}

fn battle_path() -> StatePath {
    StatePath::new(GameState::CommandMenu)
}

#[test]
fn first_breakout_is_b_mash() {
    let mut manager = BreakoutManager::new(BreakoutSection::default());
    let plan = manager.plan(battle_key(), battle_path(), 1000);
    assert_eq!(plan.tier, BreakoutTier::L1);
    match plan.step {
        BreakoutStep::Presses(presses) => {
            assert_eq!(presses.len(), 10);
            assert!(presses.iter().all(|p| p.button == Button::B));
            assert!(presses.iter().all(|p| p.post_delay_ms == 100));
        }
        other => panic!("expected presses, got {other:?}"),
    }
}

#[test]
fn recurrence_inside_cooldown_escalates() {
    let mut manager = BreakoutManager::new(BreakoutSection::default());
    assert_eq!(manager.plan(battle_key(), battle_path(), 1000).tier, BreakoutTier::L1);
    assert_eq!(manager.plan(battle_key(), battle_path(), 1100).tier, BreakoutTier::L2);
    assert_eq!(manager.plan(battle_key(), battle_path(), 1200).tier, BreakoutTier::L3);
    assert_eq!(manager.plan(battle_key(), battle_path(), 1300).tier, BreakoutTier::L4);
    assert_eq!(manager.plan(battle_key(), battle_path(), 1400).tier, BreakoutTier::L5);
    // L5 is the ceiling.
    assert_eq!(manager.plan(battle_key(), battle_path(), 1500).tier, BreakoutTier::L5);
}

#[test]
fn alarm_after_cooldown_resets_to_l1() {
    let mut manager = BreakoutManager::new(BreakoutSection::default());
    manager.plan(battle_key(), battle_path(), 1000);
    manager.plan(battle_key(), battle_path(), 1100);
    let plan = manager.plan(battle_key(), battle_path(), 5000);
    assert_eq!(plan.tier, BreakoutTier::L1);
}

#[test]
fn success_report_resets_the_mode_ladder() {
    let mut manager = BreakoutManager::new(BreakoutSection::default());
    let plan = manager.plan(battle_key(), battle_path(), 1000);
    manager.report(battle_key(), plan.tier, true);
    assert!(manager.current_tier(battle_key()).is_none());
    assert_eq!(manager.plan(battle_key(), battle_path(), 1050).tier, BreakoutTier::L1);
}

#[test]
fn modes_escalate_independently() {
    let mut manager = BreakoutManager::new(BreakoutSection::default());
    manager.plan(battle_key(), battle_path(), 1000);
    manager.plan(battle_key(), battle_path(), 1100);

    let menu = ModeKey::of(SubMode::Shop);
    let menu_path = StatePath::new(GameState::ShopBuy);
    assert_eq!(manager.plan(menu, menu_path, 1100).tier, BreakoutTier::L1);
}

#[test]
fn underperforming_tier_is_skipped() {
    let config = BreakoutSection {
        demote_min_attempts: 10,
        demote_below_rate: 0.2,
        ..Default::default()
    };
    let mut manager = BreakoutManager::new(config);

    // Ten failed L1 attempts for this mode, each outside the cooldown so
    // the ladder keeps restarting at L1.
    for i in 0..10u64 {
        let plan = manager.plan(battle_key(), battle_path(), 10_000 * (i + 1));
        assert_eq!(plan.tier, BreakoutTier::L1);
        manager.report(battle_key(), plan.tier, false);
    }
    assert!(manager.success_rate(agent_core::Mode::Battle, BreakoutTier::L1) < 0.2);

    // L1 is burned for battle modes; selection starts at L2 now.
    let plan = manager.plan(battle_key(), battle_path(), 200_000);
    assert_eq!(plan.tier, BreakoutTier::L2);
}

#[test]
fn deep_tiers_reach_for_snapshots() {
    let mut manager = BreakoutManager::new(BreakoutSection::default());
    manager.plan(battle_key(), battle_path(), 1000);
    manager.plan(battle_key(), battle_path(), 1100);
    manager.plan(battle_key(), battle_path(), 1200);
    let l4 = manager.plan(battle_key(), battle_path(), 1300);
    assert!(matches!(
        l4.step,
        BreakoutStep::ReloadSnapshot { max_age_ms: 120_000 }
    ));
    let l5 = manager.plan(battle_key(), battle_path(), 1400);
    assert_eq!(l5.step, BreakoutStep::HardReset);
}

#[test]
fn menu_escape_is_path_specific() {
    let menu_presses = oakbot_core::breakout::menu_escape_sequence(StatePath::new(GameState::ShopBuy));
    assert!(menu_presses.iter().any(|p| p.button == Button::B));
    assert_eq!(menu_presses.last().unwrap().button, Button::Start);

    let battle_presses = oakbot_core::breakout::menu_escape_sequence(battle_path());
    assert_eq!(battle_presses.last().unwrap().button, Button::A);
}
