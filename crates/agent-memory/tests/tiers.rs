use agent_memory::{
    signature_of, ObservedDelta, ObserverItem, ObserverMemory, StrategistMemory, TacticianMemory,
};

fn item(tick: u64, action: &str, success: bool) -> ObserverItem {
    ObserverItem {
        tick_id: tick,
        action: Some(action.to_string()),
        delta: ObservedDelta::default(),
        success,
    }
}

#[test]
fn observer_is_bounded_and_drops_oldest() {
    let mut observer = ObserverMemory::new(100);
    for tick in 0..150 {
        observer.append(item(tick, "walk", true));
    }
    assert_eq!(observer.len(), 100);
    // The first fifty were dropped.
    assert_eq!(observer.recent(200).next().unwrap().tick_id, 50);
    assert_eq!(observer.latest().unwrap().tick_id, 149);
}

#[test]
fn observer_success_rate_ignores_skip_ticks() {
    let mut observer = ObserverMemory::default();
    observer.append(item(1, "walk", true));
    observer.append(ObserverItem {
        tick_id: 2,
        action: None,
        delta: ObservedDelta::default(),
        success: false,
    });
    observer.append(item(3, "walk", false));
    assert_eq!(observer.success_rate_last(10), 0.5);
}

#[test]
fn empty_success_rate_defaults_to_one() {
    let observer = ObserverMemory::default();
    assert_eq!(observer.success_rate_last(20), 1.0);
}

#[test]
fn strategist_progress_is_monotone() {
    let mut strategist = StrategistMemory::new("s1");
    strategist.set_progress("defeat_brock", 0.4);
    strategist.set_progress("defeat_brock", 0.2);
    assert_eq!(strategist.get("defeat_brock").unwrap().progress, 0.4);
    strategist.set_progress("defeat_brock", 0.9);
    assert_eq!(strategist.get("defeat_brock").unwrap().progress, 0.9);
}

#[test]
fn strategist_checkpoint_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session-s1.json");

    let mut strategist = StrategistMemory::new("s1");
    strategist.set_progress("defeat_brock", 0.5);
    strategist.record_outcome("defeat_brock", true);
    strategist.record_outcome("defeat_brock", false);
    strategist.checkpoint(&path).unwrap();

    let restored = StrategistMemory::restore(&path).unwrap();
    assert_eq!(restored.session_id(), "s1");
    let record = restored.get("defeat_brock").unwrap();
    assert_eq!(record.attempts, 2);
    assert_eq!(record.win_rate, 0.5);
    assert_eq!(record.progress, 0.5);
}

#[test]
fn tactician_insert_is_idempotent_per_signature() {
    let mut tactician = TacticianMemory::new();
    let sig = signature_of(&[b"battle.menu", b"press_a"]);
    tactician.observe(sig, "press_a", true, 10).unwrap();
    tactician.observe(sig, "press_a", true, 20).unwrap();
    tactician.observe(sig, "press_a", false, 30).unwrap();

    assert_eq!(tactician.len(), 1);
    let pattern = tactician.get(&sig).unwrap();
    assert_eq!(pattern.evidence_count, 3);
    assert_eq!(pattern.successes, 2);
    // Beta(1,1) posterior: (1 + 2) / (2 + 3).
    assert!((pattern.confidence - 0.6).abs() < 1e-6);
    assert_eq!(pattern.last_used_tick, 30);
}

#[test]
fn tactician_log_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tactician.log");

    let sig = signature_of(&[b"trigger"]);
    {
        let mut tactician = TacticianMemory::open(&path).unwrap();
        tactician.observe(sig, "mash_b", true, 5).unwrap();
        tactician.observe(sig, "mash_b", true, 6).unwrap();
    }

    let reopened = TacticianMemory::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get(&sig).unwrap().evidence_count, 2);
}

#[test]
fn tactician_prunes_low_confidence_with_enough_evidence() {
    let mut tactician = TacticianMemory::new();
    let weak = signature_of(&[b"weak"]);
    let young = signature_of(&[b"young"]);
    for tick in 0..6 {
        tactician.observe(weak, "noop", false, tick).unwrap();
    }
    tactician.observe(young, "noop", false, 1).unwrap();

    // weak: (1+0)/(2+6) = 0.125 with 6 pieces of evidence -> pruned.
    // young: low confidence but only 1 observation -> kept.
    assert_eq!(tactician.prune(), 1);
    assert!(tactician.get(&weak).is_none());
    assert!(tactician.get(&young).is_some());
}

#[test]
fn decay_only_covers_idle_window() {
    let mut tactician = TacticianMemory::new();
    let sig = signature_of(&[b"sig"]);
    tactician.observe(sig, "noop", true, 1000).unwrap();
    let before = tactician.get(&sig).unwrap().confidence;

    // Used at tick 1000; decaying the window (0, 1000] is a no-op.
    tactician.decay(1000, 0, 1e-3);
    assert_eq!(tactician.get(&sig).unwrap().confidence, before);

    tactician.decay(2000, 1000, 1e-3);
    let after = tactician.get(&sig).unwrap().confidence;
    assert!((after / before - (-1.0f64).exp() as f32).abs() < 1e-3);
}
