use std::path::Path;
use std::sync::{Arc, Mutex};

use agent_core::{Button, ObservationFlags, ScreenKind};
use oakbot_core::config::AgentConfig;
use oakbot_core::emulator::wram::ADDR_BADGES;
use oakbot_core::perception::encode_stub_frame;
use oakbot_core::{
    EmulatorPort, PerceptionError, PerceptionProvider, Scheduler, ScriptedEmulator, StopCondition,
    StubPerception,
};

fn test_config(root: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.tick.realtime = false;
    config.resolve_paths(root);
    config
}

fn title_emulator() -> ScriptedEmulator {
    let mut emu = ScriptedEmulator::new();
    let frame = encode_stub_frame(
        ScreenKind::Title,
        ObservationFlags::empty(),
        None,
        None,
        "PUSH START",
    );
    emu.set_screen(&frame);
    emu
}

#[test]
fn default_seed_gates_gyms_behind_hm_goals() {
    let planner = agent_goap::GoapPlanner::new(
        oakbot_core::scheduler::default_goals(),
        agent_goap::PlannerConfig::default(),
    )
    .unwrap();
    let graph = planner.graph();

    let cut = graph.get("obtain_cut").expect("cut goal seeded");
    assert!(cut.prereqs.contains("defeat_brock"));
    let surf = graph.get("obtain_surf").expect("surf goal seeded");
    assert!(surf.prereqs.contains("defeat_erika"));

    // The HM goals gate later gyms, not just dangle off the badge line.
    assert!(graph
        .get("defeat_lt_surge")
        .unwrap()
        .prereqs
        .contains("obtain_cut"));
    assert!(graph
        .get("defeat_blaine")
        .unwrap()
        .prereqs
        .contains("obtain_surf"));
}

#[tokio::test]
async fn cold_start_stays_quiet_and_presses_buttons() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut scheduler = Scheduler::new(
        config,
        Box::new(title_emulator()),
        Box::new(StubPerception::new()),
    )
    .unwrap();
    let summary = scheduler.run(StopCondition::ticks(100)).await.unwrap();

    assert_eq!(summary.ticks, 100);
    assert_eq!(summary.skipped_ticks, 0);
    assert_eq!(summary.stop.exit_code(), 2);

    // The press-start profile never closed, so it stays cold and unsampled.
    let status = scheduler.handle().status();
    assert_eq!(
        status.mode.as_deref(),
        Some("title.press_start"),
        "status should reflect the stable mode"
    );

    // No anomaly/breakout events on a cold profile.
    let events = oakbot_core::EventEmitter::new(dir.path().join(".oakbot/events.jsonl"))
        .read_recent(100);
    assert!(events
        .iter()
        .all(|e| e.kind != oakbot_core::FailsafeEventKind::AnomalyCritical));
}

#[tokio::test]
async fn planner_drives_a_presses_on_the_title_screen() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    struct LoggingEmulator {
        inner: ScriptedEmulator,
        log: Arc<Mutex<Vec<Button>>>,
    }
    impl EmulatorPort for LoggingEmulator {
        fn tick(&mut self) -> Result<(), oakbot_core::EmulatorError> {
            self.inner.tick()
        }
        fn screen(&self) -> &[u8] {
            self.inner.screen()
        }
        fn read_wram(&self, addr: u16, len: u16) -> Result<Vec<u8>, oakbot_core::EmulatorError> {
            self.inner.read_wram(addr, len)
        }
        fn press(&mut self, button: Button, hold_ms: u16) -> Result<(), oakbot_core::EmulatorError> {
            self.log.lock().unwrap().push(button);
            self.inner.press(button, hold_ms)
        }
        fn save_state(&self) -> Result<Vec<u8>, oakbot_core::EmulatorError> {
            self.inner.save_state()
        }
        fn load_state(&mut self, blob: &[u8]) -> Result<(), oakbot_core::EmulatorError> {
            self.inner.load_state(blob)
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new(
        config,
        Box::new(LoggingEmulator {
            inner: title_emulator(),
            log: Arc::clone(&log),
        }),
        Box::new(StubPerception::new()),
    )
    .unwrap();
    scheduler.run(StopCondition::ticks(100)).await.unwrap();

    let presses = log.lock().unwrap();
    let a_presses = presses.iter().filter(|b| **b == Button::A).count();
    assert!(
        a_presses >= 5,
        "expected at least 5 A presses over 100 ticks, got {a_presses}"
    );
}

#[tokio::test]
async fn perception_failures_skip_ticks_without_pressing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    struct FlakyPerception {
        inner: StubPerception,
        fail_until: u64,
    }
    impl PerceptionProvider for FlakyPerception {
        fn produce(
            &mut self,
            tick_id: u64,
            screen: &[u8],
            world: &oakbot_core::emulator::wram::WorldReading,
        ) -> Result<agent_core::Observation, PerceptionError> {
            if tick_id <= self.fail_until {
                return Err(PerceptionError::Unreadable("scripted failure".into()));
            }
            self.inner.produce(tick_id, screen, world)
        }
    }

    let mut scheduler = Scheduler::new(
        config,
        Box::new(title_emulator()),
        Box::new(FlakyPerception {
            inner: StubPerception::new(),
            fail_until: 10,
        }),
    )
    .unwrap();
    let summary = scheduler.run(StopCondition::ticks(50)).await.unwrap();

    assert_eq!(summary.ticks, 50);
    assert_eq!(summary.skipped_ticks, 10);
}

#[tokio::test]
async fn graceful_stop_flushes_and_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let profiles_path = config.profile.path.clone();
    let snapshot_dir = config.snapshot.dir.clone();
    let events_path = config.events_path.clone();

    let mut scheduler = Scheduler::new(
        config,
        Box::new(title_emulator()),
        Box::new(StubPerception::new()),
    )
    .unwrap();
    let handle = scheduler.handle();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.request_stop("budget");
    });

    let summary = scheduler.run(StopCondition::unbounded()).await.unwrap();
    stopper.await.unwrap();

    assert_eq!(summary.stop.exit_code(), 2);
    let tick = summary.ticks;

    assert!(profiles_path.exists(), "profiles flushed on shutdown");
    let snap = snapshot_dir.join(format!("snap-{tick}-graceful-stop.bin"));
    assert!(snap.exists(), "graceful-stop snapshot written");

    let events = oakbot_core::EventEmitter::new(events_path).read_recent(10);
    assert!(events
        .iter()
        .any(|e| e.kind == oakbot_core::FailsafeEventKind::GracefulStop));
}

#[tokio::test]
async fn badge_milestones_write_named_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let snapshot_dir = config.snapshot.dir.clone();

    struct BadgeEmulator {
        inner: ScriptedEmulator,
    }
    impl EmulatorPort for BadgeEmulator {
        fn tick(&mut self) -> Result<(), oakbot_core::EmulatorError> {
            self.inner.tick()?;
            // Boulder badge appears at frame 20.
            if self.inner.frame() == 20 {
                self.inner.write_wram(ADDR_BADGES, &[0b0000_0001]);
            }
            Ok(())
        }
        fn screen(&self) -> &[u8] {
            self.inner.screen()
        }
        fn read_wram(&self, addr: u16, len: u16) -> Result<Vec<u8>, oakbot_core::EmulatorError> {
            self.inner.read_wram(addr, len)
        }
        fn press(&mut self, button: Button, hold_ms: u16) -> Result<(), oakbot_core::EmulatorError> {
            self.inner.press(button, hold_ms)
        }
        fn save_state(&self) -> Result<Vec<u8>, oakbot_core::EmulatorError> {
            self.inner.save_state()
        }
        fn load_state(&mut self, blob: &[u8]) -> Result<(), oakbot_core::EmulatorError> {
            self.inner.load_state(blob)
        }
    }

    let mut scheduler = Scheduler::new(
        config,
        Box::new(BadgeEmulator {
            inner: title_emulator(),
        }),
        Box::new(StubPerception::new()),
    )
    .unwrap();
    let summary = scheduler.run(StopCondition::ticks(60)).await.unwrap();

    assert!(summary
        .goals_completed
        .contains(&"defeat_brock".to_string()));
    assert!(snapshot_dir.join("snap-20-milestone.bin").exists());
}

#[tokio::test]
async fn overworld_entry_writes_boot_complete_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let snapshot_dir = config.snapshot.dir.clone();

    let mut emu = ScriptedEmulator::new();
    let frame = encode_stub_frame(
        ScreenKind::Overworld,
        ObservationFlags::empty(),
        None,
        None,
        "",
    );
    emu.set_screen(&frame);

    let mut scheduler =
        Scheduler::new(config, Box::new(emu), Box::new(StubPerception::new())).unwrap();
    scheduler.run(StopCondition::ticks(10)).await.unwrap();

    assert!(snapshot_dir.join("snap-1-boot-complete.bin").exists());
}
