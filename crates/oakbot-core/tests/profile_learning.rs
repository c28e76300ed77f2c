use agent_core::{ModeKey, SubMode};
use oakbot_core::profile::ModeDurationTracker;

const TICK_MS: u64 = 33;

fn key(sub: SubMode) -> ModeKey {
    ModeKey::of(sub)
}

#[test]
fn dwell_window_opens_and_closes_on_mode_change() {
    let mut tracker = ModeDurationTracker::new(0.3, 30, TICK_MS);

    assert!(tracker.ingest(Some(key(SubMode::PressStart)), 1).is_none());
    assert_eq!(tracker.current_mode(), Some(key(SubMode::PressStart)));
    assert!(tracker.ingest(Some(key(SubMode::PressStart)), 2).is_none());

    let closed = tracker.ingest(Some(key(SubMode::Idle)), 11).unwrap();
    assert_eq!(closed.from, key(SubMode::PressStart));
    assert_eq!(closed.dwell_ms, 10 * TICK_MS);
    assert_eq!(tracker.samples(key(SubMode::PressStart)), 1);
    assert_eq!(tracker.current_mode(), Some(key(SubMode::Idle)));
}

#[test]
fn transition_states_leave_the_window_open() {
    let mut tracker = ModeDurationTracker::new(0.3, 30, TICK_MS);
    tracker.ingest(Some(key(SubMode::Idle)), 1);

    // Emergency/transition frames carry no mode key.
    assert!(tracker.ingest(None, 5).is_none());
    assert!(tracker.ingest(None, 6).is_none());
    assert_eq!(tracker.current_mode(), Some(key(SubMode::Idle)));

    let closed = tracker.ingest(Some(key(SubMode::BattleIntro)), 10).unwrap();
    assert_eq!(closed.from, key(SubMode::Idle));
    assert_eq!(closed.dwell_ms, 9 * TICK_MS);
}

#[test]
fn sub_tick_dwells_are_not_sampled() {
    let mut tracker = ModeDurationTracker::new(0.3, 30, TICK_MS);
    tracker.ingest(Some(key(SubMode::Idle)), 1);
    // Same-tick flap closes a zero-length window.
    tracker.ingest(Some(key(SubMode::Text)), 1);
    assert_eq!(tracker.samples(key(SubMode::Idle)), 0);
}

#[test]
fn profile_is_cold_until_n_min_samples() {
    let mut tracker = ModeDurationTracker::new(0.3, 30, TICK_MS);
    let battle = key(SubMode::BattleMenu);
    let idle = key(SubMode::Idle);

    let mut tick = 0u64;
    for _ in 0..29 {
        tick += 1;
        tracker.ingest(Some(battle), tick);
        tick += 50;
        tracker.ingest(Some(idle), tick);
        tick += 1;
    }
    assert_eq!(tracker.samples(battle), 29);
    assert!(tracker.profile(battle).is_none(), "29 samples is still cold");

    tick += 1;
    tracker.ingest(Some(battle), tick);
    tick += 50;
    tracker.ingest(Some(idle), tick);
    assert_eq!(tracker.samples(battle), 30);
    let profile = tracker.profile(battle).expect("warm at 30 samples");
    assert!(profile.mean_ms > 0.0);
    assert!(profile.var_ms >= 0.0);
}

#[test]
fn samples_count_increases_by_one_per_close() {
    let mut tracker = ModeDurationTracker::new(0.3, 30, TICK_MS);
    let battle = key(SubMode::BattleMenu);
    let idle = key(SubMode::Idle);

    let mut tick = 0u64;
    for expected in 1..=10u64 {
        tick += 1;
        tracker.ingest(Some(battle), tick);
        tick += 20;
        tracker.ingest(Some(idle), tick);
        assert_eq!(tracker.samples(battle), expected);
    }
}

#[test]
fn ewma_mean_tracks_the_sample_stream() {
    let mut tracker = ModeDurationTracker::new(0.3, 1, TICK_MS);
    let battle = key(SubMode::BattleMenu);
    let idle = key(SubMode::Idle);

    let mut tick = 0u64;
    for _ in 0..50 {
        tick += 1;
        tracker.ingest(Some(battle), tick);
        tick += 50; // constant 50-tick dwells
        tracker.ingest(Some(idle), tick);
    }
    let profile = tracker.profile(battle).unwrap();
    let expected = 50.0 * TICK_MS as f64;
    assert!(
        (profile.mean_ms - expected).abs() < 1.0,
        "mean {} should converge to {}",
        profile.mean_ms,
        expected
    );
    assert!(profile.var_ms < 1.0, "constant stream has near-zero variance");
    assert!(profile.p95_ms >= profile.mean_ms);
}

#[test]
fn persist_load_round_trips_the_profile_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");

    let mut tracker = ModeDurationTracker::new(0.3, 5, TICK_MS);
    let battle = key(SubMode::BattleMenu);
    let idle = key(SubMode::Idle);
    let mut tick = 0u64;
    for _ in 0..10 {
        tick += 1;
        tracker.ingest(Some(battle), tick);
        tick += 40;
        tracker.ingest(Some(idle), tick);
    }
    tracker.persist(&path).unwrap();

    let mut restored = ModeDurationTracker::new(0.3, 5, TICK_MS);
    restored.load(&path).unwrap();
    assert_eq!(tracker.to_json().unwrap(), restored.to_json().unwrap());
    assert_eq!(restored.samples(battle), 10);
}

#[test]
fn load_rejects_unknown_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    std::fs::write(&path, r#"{"schema": 99, "profiles": {}}"#).unwrap();

    let mut tracker = ModeDurationTracker::new(0.3, 5, TICK_MS);
    assert!(tracker.load(&path).is_err());
}
