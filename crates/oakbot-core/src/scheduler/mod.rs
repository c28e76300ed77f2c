//! The tick loop: fixed-order pipeline, budgets, and lifecycle.
//!
//! One worker drives emulator -> perception -> state machine -> duration
//! tracking -> anomaly check -> memory -> planner -> failsafe -> dispatch in
//! a total order every tick. Side work (snapshot writes, profile flushes)
//! goes to dedicated workers over bounded channels; consolidation runs on
//! this worker strictly between ticks.

pub mod workers;

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use agent_core::{ActionKind, ActionOutcome, AgentAction, ButtonPress, ModeKey};
use agent_goap::{Goal, GoalCategory, GoapPlanner, PlannerConfig, PlannerInputs};
use agent_hsm::{Category, GameState, Hsm, StatePath};
use agent_memory::{
    Consolidator, MemoryView, ObservedDelta, ObserverItem, ObserverMemory, StrategistMemory,
    TacticianMemory,
};
use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::anomaly::{Alarm, AnomalyDetector};
use crate::breakout::{menu_escape_sequence, BreakoutManager, BreakoutStep, BreakoutTier};
use crate::config::AgentConfig;
use crate::dispatcher::{ButtonDispatcher, DispatchOutcome};
use crate::emulator::wram::{read_world, WorldReading};
use crate::emulator::EmulatorPort;
use crate::events::{EventEmitter, FailsafeEvent, FailsafeEventKind};
use crate::failsafe::{FailsafeCoordinator, RecoveryStep, SoftlockKind};
use crate::oracle::DecisionOracle;
use crate::perception::PerceptionProvider;
use crate::profile::ModeDurationTracker;
use crate::snapshot::{self, SnapshotMeta, SnapshotReason, SnapshotStore};
use crate::status::AgentStatus;

use workers::{ProfileFlushJob, SnapshotWriteJob};

const PERIODIC_SNAPSHOT_EVERY_TICKS: u64 = 3000;
const REDISPATCH_EVERY_TICKS: u64 = 8;
/// Minimum spacing between break-out plans for a still-alarming mode, so a
/// tier gets time to work before the next one fires.
const BREAKOUT_REARM_TICKS: u64 = 100;
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default)]
pub struct StopCondition {
    pub max_ticks: Option<u64>,
}

impl StopCondition {
    pub fn ticks(max: u64) -> Self {
        Self {
            max_ticks: Some(max),
        }
    }

    pub fn unbounded() -> Self {
        Self { max_ticks: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The terminal goal completed.
    Completed,
    /// The configured tick limit was reached.
    TickLimit,
    /// An operator asked for a stop.
    Operator(String),
    /// Graceful shutdown overran its deadline.
    FatalShutdown,
    /// The emulator failed unrecoverably.
    EmulatorFatal(String),
}

impl StopReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::Completed => 0,
            StopReason::TickLimit | StopReason::Operator(_) => 2,
            StopReason::FatalShutdown => 3,
            StopReason::EmulatorFatal(_) => 4,
        }
    }
}

/// Terminal report returned by `run`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub wall_ms: u64,
    pub overruns: u64,
    pub degraded_ticks: u64,
    pub goals_completed: Vec<String>,
    pub mode_totals_ms: BTreeMap<String, u64>,
    pub stop: StopReason,
}

impl SessionSummary {
    pub fn summary(&self) -> String {
        format!(
            "session {}: {} ticks ({} skipped, {} overruns), {} goals done, stop: {:?}",
            self.session_id,
            self.ticks,
            self.skipped_ticks,
            self.overruns,
            self.goals_completed.len(),
            self.stop
        )
    }
}

/// Cloneable control surface over a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    stop_reason: Arc<Mutex<Option<String>>>,
    paused: Arc<AtomicBool>,
    status: Arc<Mutex<AgentStatus>>,
}

impl SchedulerHandle {
    /// Cooperative cancellation: the current tick completes first.
    pub fn request_stop(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.stop_reason.lock() {
            slot.get_or_insert(reason.into());
        }
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Admissible between ticks only; the loop parks at the next boundary.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> AgentStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

struct ActiveAction {
    action: AgentAction,
    started_tick: u64,
    start_reading: WorldReading,
    last_dispatch_tick: u64,
}

/// Owns every per-tick component and drives the pipeline.
pub struct Scheduler {
    config: AgentConfig,
    session_id: String,

    emulator: Box<dyn EmulatorPort>,
    perception: Box<dyn PerceptionProvider>,
    oracle: Option<Box<dyn DecisionOracle>>,

    hsm: Hsm,
    tracker: ModeDurationTracker,
    anomaly: AnomalyDetector,
    breakout: BreakoutManager,
    failsafe: FailsafeCoordinator,
    observer: ObserverMemory,
    strategist: StrategistMemory,
    tactician: TacticianMemory,
    consolidator: Consolidator,
    planner: GoapPlanner,
    dispatcher: ButtonDispatcher,
    snapshots: SnapshotStore,
    emitter: EventEmitter,

    handle: SchedulerHandle,

    tick_id: u64,
    press_queue: VecDeque<ButtonPress>,
    pending_breakout: Option<(ModeKey, BreakoutTier)>,
    active_action: Option<ActiveAction>,
    last_breakout_tick: Option<u64>,
    last_alarm: Alarm,
    last_dispatch_failed: Option<String>,
    prev_reading: WorldReading,
    prev_in_battle: bool,
    boot_snapshot_written: bool,

    consecutive_overruns: u32,
    degraded: bool,
    overruns: u64,
    degraded_ticks: u64,
    skipped_ticks: u64,
    goals_completed: Vec<String>,

    snapshot_tx: Option<mpsc::Sender<SnapshotWriteJob>>,
    profile_tx: Option<mpsc::Sender<ProfileFlushJob>>,
}

impl Scheduler {
    pub fn new(
        config: AgentConfig,
        emulator: Box<dyn EmulatorPort>,
        perception: Box<dyn PerceptionProvider>,
    ) -> Result<Self> {
        let session_id = Uuid::new_v4().to_string();

        let mut tracker = ModeDurationTracker::new(
            config.profile.ewma_alpha,
            config.profile.n_min,
            config.tick_interval_ms(),
        );
        if config.profile.path.exists() {
            tracker
                .load(&config.profile.path)
                .with_context(|| "loading duration profiles")?;
        }

        let tactician = TacticianMemory::open(&config.memory.tactician_log)
            .context("opening tactician log")?;

        let planner = GoapPlanner::new(
            default_goals(),
            PlannerConfig {
                strategic_every_ticks: config.planner.strategic_every_ticks,
                tactical_every_ticks: config.planner.tactical_every_ticks,
                discount_gamma: config.planner.discount_gamma,
                repair_attempts: config.planner.repair_attempts,
                plan_ttl_ticks: config.planner.plan_ttl_ticks,
                critical_hp_pct: config.planner.critical_hp_pct,
            },
        )?;

        let handle = SchedulerHandle {
            stop: Arc::new(AtomicBool::new(false)),
            stop_reason: Arc::new(Mutex::new(None)),
            paused: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(AgentStatus::default())),
        };

        Ok(Self {
            hsm: Hsm::new(config.hsm.ambiguity_threshold),
            anomaly: AnomalyDetector::new(config.anomaly.clone()),
            breakout: BreakoutManager::new(config.breakout.clone()),
            failsafe: FailsafeCoordinator::new(config.failsafe.clone()),
            observer: ObserverMemory::new(config.memory.observer_capacity),
            strategist: StrategistMemory::new(session_id.clone()),
            tactician,
            consolidator: Consolidator::new(
                config.memory.consolidation_interval_ticks,
                config.memory.promotion_threshold,
                config.memory.decay_lambda,
            ),
            planner,
            dispatcher: ButtonDispatcher::new(ButtonDispatcher::DEFAULT_COOLDOWN_MS),
            snapshots: SnapshotStore::new(&config.snapshot.dir, config.snapshot.ring_size),
            emitter: EventEmitter::new(&config.events_path),
            tracker,
            handle,
            session_id,
            emulator,
            perception,
            oracle: None,
            config,
            tick_id: 0,
            press_queue: VecDeque::new(),
            pending_breakout: None,
            active_action: None,
            last_breakout_tick: None,
            last_alarm: Alarm::None,
            last_dispatch_failed: None,
            prev_reading: WorldReading::default(),
            prev_in_battle: false,
            boot_snapshot_written: false,
            consecutive_overruns: 0,
            degraded: false,
            overruns: 0,
            degraded_ticks: 0,
            skipped_ticks: 0,
            goals_completed: Vec::new(),
            snapshot_tx: None,
            profile_tx: None,
        })
    }

    pub fn with_oracle(mut self, oracle: Box<dyn DecisionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Drives the loop until a stop condition fires, then shuts down
    /// gracefully and returns the session summary.
    pub async fn run(&mut self, until: StopCondition) -> Result<SessionSummary> {
        let wall_start = Instant::now();
        let interval = Duration::from_millis(self.config.tick_interval_ms());

        let (snapshot_tx, snapshot_worker) =
            workers::spawn_snapshot_writer(self.config.snapshot.writer_queue_depth);
        let (profile_tx, profile_worker) = workers::spawn_profile_persistor(
            Duration::from_secs(self.config.profile.persist_debounce_secs),
        );
        self.snapshot_tx = Some(snapshot_tx);
        self.profile_tx = Some(profile_tx);

        info!(session = %self.session_id, "tick loop starting");

        let stop = loop {
            if self.handle.stop.load(Ordering::SeqCst) {
                let reason = self
                    .handle
                    .stop_reason
                    .lock()
                    .ok()
                    .and_then(|r| r.clone())
                    .unwrap_or_else(|| "requested".to_string());
                break StopReason::Operator(reason);
            }
            if let Some(max) = until.max_ticks {
                if self.tick_id >= max {
                    break StopReason::TickLimit;
                }
            }
            if self.terminal_goal_completed() {
                break StopReason::Completed;
            }
            while self.handle.is_paused() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }

            let tick_start = Instant::now();
            if let Err(fatal) = self.tick_once() {
                self.emit_event(FailsafeEvent::new(
                    FailsafeEventKind::EmulatorFatal,
                    self.tick_id,
                    fatal.clone(),
                ));
                break StopReason::EmulatorFatal(fatal);
            }

            self.between_ticks();

            let elapsed = tick_start.elapsed();
            self.account_budget(elapsed);
            if self.config.tick.realtime && elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        };

        let stop = self.graceful_shutdown(stop).await;

        // Close the worker channels and let them drain.
        self.snapshot_tx = None;
        self.profile_tx = None;
        let _ = snapshot_worker.await;
        let _ = profile_worker.await;

        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            ticks: self.tick_id,
            skipped_ticks: self.skipped_ticks,
            wall_ms: wall_start.elapsed().as_millis() as u64,
            overruns: self.overruns,
            degraded_ticks: self.degraded_ticks,
            goals_completed: self.goals_completed.clone(),
            mode_totals_ms: self.tracker.cumulative_totals(),
            stop,
        };
        info!("{}", summary.summary());
        Ok(summary)
    }

    /// One pass through the fixed pipeline. `Err` is an unrecoverable
    /// emulator condition.
    fn tick_once(&mut self) -> std::result::Result<(), String> {
        self.tick_id += 1;
        let tick = self.tick_id;

        // 1. Frame step.
        if let Err(err) = self.emulator.tick() {
            if err.is_fatal() {
                return Err(err.to_string());
            }
            warn!(%err, tick, "emulator tick error, skipping");
            self.skip_tick();
            return Ok(());
        }

        // 2. WRAM window + perception.
        let reading = match read_world(self.emulator.as_ref()) {
            Ok(reading) => reading,
            Err(err) => {
                if err.is_fatal() {
                    return Err(err.to_string());
                }
                debug!(%err, tick, "wram unavailable, skipping tick");
                self.skip_tick();
                return Ok(());
            }
        };
        let obs = match self
            .perception
            .produce(tick, self.emulator.screen(), &reading)
        {
            Ok(obs) => obs,
            Err(err) => {
                debug!(%err, tick, "perception error, skipping tick");
                self.skip_tick();
                return Ok(());
            }
        };

        // 3. Classification.
        let classification = self.hsm.classify(&obs).map_err(|e| e.to_string())?;
        let path = classification.path;
        if path.leaf() == GameState::AmbiguousState {
            self.emit_event(
                FailsafeEvent::new(
                    FailsafeEventKind::AmbiguousState,
                    tick,
                    "classification confidence below threshold for three ticks",
                )
                .with_path(path.leaf().id()),
            );
        }
        self.maybe_boot_snapshot(path, tick);

        // 4. Dwell tracking; a mode change closes the previous window.
        let mode_key = path.mode_key();
        let transition = self.tracker.ingest(mode_key, tick);
        if let Some(closed) = &transition {
            debug!(from = %closed.from, dwell_ms = closed.dwell_ms, "mode closed");
            if let Some((pending_key, tier)) = self.pending_breakout.take() {
                let escaped = pending_key == closed.from;
                self.breakout.report(pending_key, tier, escaped);
                if escaped {
                    self.failsafe.reset_ladder();
                }
            }
            self.send_profile_flush();
        }

        // 5. Anomaly check against the warm profile.
        if let Some(key) = self.tracker.current_mode() {
            let dwell = self.tracker.current_dwell_ms(tick);
            let reading2 = self.anomaly.check(dwell, self.tracker.profile(key));
            if reading2.alarm == Alarm::Warn && self.last_alarm == Alarm::None {
                self.emit_event(
                    FailsafeEvent::new(
                        FailsafeEventKind::AnomalyWarn,
                        tick,
                        format!("dwell {dwell}ms in {key}"),
                    )
                    .with_mode(key.to_string())
                    .with_path(path.leaf().id()),
                );
            }
            let rearmed = self
                .last_breakout_tick
                .map(|t| tick.saturating_sub(t) >= BREAKOUT_REARM_TICKS)
                .unwrap_or(true);
            if reading2.alarm == Alarm::Critical && rearmed {
                self.last_breakout_tick = Some(tick);
                self.on_critical_anomaly(key, path, tick, dwell);
            }
            self.last_alarm = reading2.alarm;
        }

        // 6. Action bookkeeping feeds the observer and the planner.
        let outcome = self.evaluate_active_action(&reading, path, tick);
        if let Some(outcome) = outcome {
            self.finish_action(outcome, tick);
        }
        self.append_observer_item(tick, &reading);

        // 7. Planner step.
        let memory_view = MemoryView::capture(&self.observer, &self.strategist, &self.tactician);
        let world = reading.to_world_model();
        let milestone_changed = reading.badges != self.prev_reading.badges;
        if milestone_changed {
            self.maybe_milestone_snapshot(&reading, tick);
        }
        let inputs = PlannerInputs {
            tick,
            mode: mode_key,
            mode_changed: transition.is_some(),
            milestone_changed,
            hp_pct: obs.hp_pct().or(Some(reading.lead_hp_pct)),
            dialog_choice_pending: matches!(
                path.leaf(),
                GameState::ChoiceYesNo | GameState::ChoiceMulti
            ),
            battle_started: reading.in_battle && !self.prev_in_battle,
        };
        let decision = self.planner.step(&inputs, &world, &memory_view);
        for goal in &decision.completed_goals {
            info!(goal = %goal, "goal completed");
            self.goals_completed.push(goal.clone());
            self.strategist.set_progress(goal, 1.0);
        }

        let mut ai_confidence = None;
        let mut oracle_hint = None;
        if let Some(oracle) = self.oracle.as_mut() {
            if let Some((hint, conf)) = oracle.propose(
                path,
                &memory_view,
                decision.goal_id.as_deref(),
            ) {
                ai_confidence = Some(conf);
                oracle_hint = Some(hint);
            }
        }

        // 8. Failsafe review.
        self.failsafe.observe_tick(
            tick,
            !classification.ambiguous,
            reading.position(),
            decision
                .action
                .as_ref()
                .map(|a| a.kind.name()),
            decision
                .action
                .as_ref()
                .map(|a| a.kind.is_movement())
                .unwrap_or(false),
            self.strategist.aggregate_win_rate(),
        );
        let confidence = self
            .failsafe
            .score(ai_confidence, classification.confidence);
        let softlocks = self.failsafe.detect_softlocks(tick);
        let emergency = path.is_emergency();
        if self.failsafe.is_low(&confidence) || !softlocks.is_empty() || emergency {
            self.run_recovery(&softlocks, confidence.aggregate, path, tick);
        }

        // 9. Dispatch: break-out presses first, then the planned action.
        self.last_dispatch_failed = None;
        if !self.press_queue.is_empty() {
            let presses: Vec<ButtonPress> = self.press_queue.drain(..).collect();
            if let DispatchOutcome::Failed { reason } =
                self.dispatcher.emit(&presses, self.emulator.as_mut())
            {
                warn!(reason = %reason, "break-out press rejected");
                self.last_dispatch_failed = Some(reason);
            }
        } else if !emergency {
            let chosen = decision.action.clone().or(oracle_hint);
            if let Some(action) = chosen {
                self.dispatch_action(action, path, tick);
            }
        }

        // 10. Status for the control surface.
        self.update_status(path, decision.goal_id.as_deref(), confidence.aggregate);
        self.prev_in_battle = reading.in_battle;
        self.prev_reading = reading;
        Ok(())
    }

    /// A tick that counts but presses nothing.
    fn skip_tick(&mut self) {
        self.skipped_ticks += 1;
        self.observer.append(ObserverItem {
            tick_id: self.tick_id,
            action: None,
            delta: ObservedDelta::default(),
            success: false,
        });
    }

    fn between_ticks(&mut self) {
        self.hsm.flush_events();

        if self.consolidator.due(self.tick_id) && !self.degraded {
            match self.consolidator.run(
                self.tick_id,
                &self.observer,
                &mut self.strategist,
                &mut self.tactician,
            ) {
                Ok(report) => {
                    debug!("consolidation: {}", report.summary());
                    self.checkpoint_strategist();
                }
                Err(err) => warn!(%err, "consolidation failed"),
            }
        }

        if self.tick_id % PERIODIC_SNAPSHOT_EVERY_TICKS == 0 && self.tick_id > 0 {
            self.enqueue_ring_snapshot(SnapshotReason::Periodic);
        }
    }

    fn account_budget(&mut self, elapsed: Duration) {
        let budget = Duration::from_millis(self.config.tick.budget_ms);
        if elapsed > budget {
            self.overruns += 1;
            self.consecutive_overruns += 1;
            warn!(
                tick = self.tick_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "tick budget overrun"
            );
            if self.consecutive_overruns >= self.config.tick.degrade_after_overruns && !self.degraded
            {
                self.degraded = true;
                self.perception.set_degraded(true);
                warn!(tick = self.tick_id, "entering degraded mode");
            }
        } else {
            self.consecutive_overruns = 0;
            if self.degraded {
                self.degraded = false;
                self.perception.set_degraded(false);
                info!(tick = self.tick_id, "leaving degraded mode");
            }
        }
        if self.degraded {
            self.degraded_ticks += 1;
        }
    }

    fn on_critical_anomaly(&mut self, key: ModeKey, path: StatePath, tick: u64, dwell_ms: u64) {
        self.emit_event(
            FailsafeEvent::new(
                FailsafeEventKind::AnomalyCritical,
                tick,
                format!("dwell {dwell_ms}ms in {key}"),
            )
            .with_mode(key.to_string())
            .with_path(path.leaf().id()),
        );

        let plan = self.breakout.plan(key, path, tick);
        self.emit_event(
            FailsafeEvent::new(
                FailsafeEventKind::Breakout,
                tick,
                format!("tier {}", plan.tier.label()),
            )
            .with_mode(key.to_string()),
        );
        self.pending_breakout = Some((key, plan.tier));
        self.execute_breakout_step(plan.step, tick);
    }

    fn execute_breakout_step(&mut self, step: BreakoutStep, tick: u64) {
        match step {
            BreakoutStep::Presses(presses) => {
                // Injected at the head, ahead of any planned action.
                for press in presses.into_iter().rev() {
                    self.press_queue.push_front(press);
                }
            }
            BreakoutStep::ReloadSnapshot { max_age_ms } => {
                self.restore_snapshot(tick, max_age_ms);
            }
            BreakoutStep::HardReset => {
                self.hard_reset(tick);
            }
        }
    }

    fn restore_snapshot(&mut self, tick: u64, max_age_ms: u64) {
        let target = self
            .snapshots
            .latest_restorable(tick, Utc::now(), max_age_ms)
            .cloned();
        let Some(meta) = target else {
            if self.failsafe.record_snapshot_failure() {
                self.handle.request_stop("snapshots exhausted");
            }
            return;
        };

        // Preserve the state we are abandoning, then load.
        self.enqueue_ring_snapshot(SnapshotReason::PreRecovery);
        match self.snapshots.load(&meta) {
            Ok(decoded) => match self.emulator.load_state(&decoded.payload) {
                Ok(()) => {
                    self.emit_event(
                        FailsafeEvent::new(
                            FailsafeEventKind::SnapshotRestored,
                            tick,
                            format!("restored tick {}", decoded.tick_id),
                        )
                        .with_snapshot(meta.file.display().to_string()),
                    );
                    self.planner.abandon_plan();
                    self.active_action = None;
                }
                Err(err) => {
                    warn!(%err, "restoring snapshot failed");
                    if self.failsafe.record_snapshot_failure() {
                        self.handle.request_stop("repeated snapshot load failures");
                    }
                }
            },
            Err(err) => {
                warn!(%err, "reading snapshot failed, advancing ladder");
                if self.failsafe.record_snapshot_failure() {
                    self.handle.request_stop("repeated snapshot load failures");
                }
            }
        }
    }

    fn hard_reset(&mut self, tick: u64) {
        self.hsm.force_emergency(GameState::HardResetPending, tick);
        let Some(meta) = self.snapshots.find_named("boot-complete").cloned() else {
            if self.failsafe.record_snapshot_failure() {
                self.handle.request_stop("no boot snapshot for hard reset");
            }
            return;
        };
        match self
            .snapshots
            .load(&meta)
            .map_err(|e| e.to_string())
            .and_then(|d| {
                self.emulator
                    .load_state(&d.payload)
                    .map_err(|e| e.to_string())
            }) {
            Ok(()) => {
                self.emit_event(
                    FailsafeEvent::new(
                        FailsafeEventKind::SnapshotRestored,
                        tick,
                        "hard reset to boot-complete",
                    )
                    .with_snapshot(meta.file.display().to_string()),
                );
                self.planner.abandon_plan();
                self.active_action = None;
            }
            Err(err) => {
                warn!(err = %err, "hard reset failed");
                if self.failsafe.record_snapshot_failure() {
                    self.handle.request_stop("hard reset failed");
                }
            }
        }
    }

    fn run_recovery(
        &mut self,
        softlocks: &[SoftlockKind],
        aggregate: f32,
        path: StatePath,
        tick: u64,
    ) {
        // One event batch per actual escalation, not per alarming tick.
        let Some(step) = self.failsafe.escalate(tick) else {
            return;
        };

        for kind in softlocks {
            let event_kind = match kind {
                SoftlockKind::PositionDeadlock => FailsafeEventKind::PositionDeadlock,
                SoftlockKind::ActionOscillation => FailsafeEventKind::ActionOscillation,
                SoftlockKind::ZeroProgress => FailsafeEventKind::ZeroProgress,
            };
            self.emit_event(
                FailsafeEvent::new(event_kind, tick, format!("confidence {aggregate:.2}"))
                    .with_path(path.leaf().id()),
            );
        }
        if softlocks.is_empty() && !path.is_emergency() {
            self.emit_event(
                FailsafeEvent::new(
                    FailsafeEventKind::LowConfidence,
                    tick,
                    format!("confidence {aggregate:.2}"),
                )
                .with_path(path.leaf().id()),
            );
        }

        match step {
            RecoveryStep::ReactiveInterrupt => {
                if let Some(goal_id) = self.planner.current_goal_id().map(String::from) {
                    self.planner.set_priority_hint(&goal_id, -0.3);
                }
                self.planner.abandon_plan();
                self.active_action = None;
            }
            RecoveryStep::MenuEscape => {
                for press in menu_escape_sequence(path).into_iter().rev() {
                    self.press_queue.push_front(press);
                }
            }
            RecoveryStep::LoadSnapshot => {
                self.restore_snapshot(tick, self.config.breakout.reload_max_age_ms);
            }
            RecoveryStep::Shutdown => {
                self.handle.request_stop("recovery ladder exhausted");
            }
        }
    }

    fn evaluate_active_action(
        &mut self,
        reading: &WorldReading,
        path: StatePath,
        tick: u64,
    ) -> Option<ActionOutcome> {
        let active = self.active_action.as_ref()?;
        if self.last_dispatch_failed.is_some() {
            return Some(ActionOutcome::Failure);
        }
        let elapsed = tick.saturating_sub(active.started_tick);
        if elapsed >= active.action.timeout_ticks as u64 {
            return Some(ActionOutcome::Failure);
        }

        let done = match &active.action.kind {
            ActionKind::Press { .. } | ActionKind::Dialog { .. } => elapsed >= 1,
            ActionKind::MenuSelect { .. } | ActionKind::Shop { .. } => elapsed >= 2,
            ActionKind::Wait { ticks } => elapsed >= *ticks as u64,
            ActionKind::NavigateTo { .. } => {
                reading.map_id != active.start_reading.map_id
                    || (elapsed > 4 && reading.position() != active.start_reading.position())
            }
            ActionKind::Battle { .. } => {
                active.start_reading.in_battle && !reading.in_battle
                    || (!active.start_reading.in_battle
                        && path.category() != Category::Battle
                        && elapsed > 8)
            }
            ActionKind::Heal => reading.lead_hp_pct >= 90,
        };
        done.then_some(ActionOutcome::Success)
    }

    fn finish_action(&mut self, outcome: ActionOutcome, tick: u64) {
        if let Some(active) = self.active_action.take() {
            self.strategist.record_outcome(
                active.action.kind.name(),
                outcome == ActionOutcome::Success,
            );
            let decision = self.planner.report_outcome(tick, outcome);
            if let Some(failed) = decision.failed_goal {
                warn!(goal = %failed, "goal failed after repair budget");
            }
        }
    }

    fn append_observer_item(&mut self, tick: u64, reading: &WorldReading) {
        let delta = ObservedDelta {
            hp_change: reading.lead_hp_pct as i16 - self.prev_reading.lead_hp_pct as i16,
            dx: reading.player_x as i16 - self.prev_reading.player_x as i16,
            dy: reading.player_y as i16 - self.prev_reading.player_y as i16,
        };
        self.observer.append(ObserverItem {
            tick_id: tick,
            action: self
                .active_action
                .as_ref()
                .map(|a| a.action.kind.name().to_string()),
            delta,
            success: self.last_dispatch_failed.is_none(),
        });
    }

    fn dispatch_action(&mut self, action: AgentAction, path: StatePath, tick: u64) {
        let is_new = self
            .active_action
            .as_ref()
            .map(|a| a.action != action)
            .unwrap_or(true);
        let due_redispatch = self
            .active_action
            .as_ref()
            .map(|a| tick.saturating_sub(a.last_dispatch_tick) >= REDISPATCH_EVERY_TICKS)
            .unwrap_or(true);
        if !is_new && !due_redispatch {
            return;
        }

        match self
            .dispatcher
            .dispatch(&action, Some(path), self.emulator.as_mut())
        {
            DispatchOutcome::Failed { reason } => {
                warn!(reason = %reason, action = action.kind.name(), "press rejected");
                self.last_dispatch_failed = Some(reason);
                self.finish_action(ActionOutcome::Failure, tick);
            }
            _ => {
                if is_new {
                    self.active_action = Some(ActiveAction {
                        action,
                        started_tick: tick,
                        start_reading: self.prev_reading.clone(),
                        last_dispatch_tick: tick,
                    });
                } else if let Some(active) = self.active_action.as_mut() {
                    active.last_dispatch_tick = tick;
                }
            }
        }
    }

    fn maybe_boot_snapshot(&mut self, path: StatePath, tick: u64) {
        if self.boot_snapshot_written || path.category() != Category::Overworld {
            return;
        }
        self.boot_snapshot_written = true;
        self.write_named_snapshot("boot-complete", SnapshotReason::BootComplete, tick);
    }

    fn maybe_milestone_snapshot(&mut self, reading: &WorldReading, tick: u64) {
        if reading.badges.count_ones() > self.prev_reading.badges.count_ones() {
            let name = format!("badge-{}", reading.badge_count());
            self.write_named_snapshot(&name, SnapshotReason::Milestone, tick);
        }
    }

    fn write_named_snapshot(&mut self, name: &str, reason: SnapshotReason, tick: u64) {
        let payload = match self.emulator.save_state() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, name, "save_state failed for named snapshot");
                return;
            }
        };
        let hash = self.agent_hash();
        if let Err(err) = self
            .snapshots
            .write(tick, reason, Some(name), &hash, &payload)
        {
            warn!(%err, name, "named snapshot write failed");
            self.emit_event(FailsafeEvent::new(
                FailsafeEventKind::SnapshotWriteFailed,
                tick,
                err.to_string(),
            ));
        }
    }

    fn enqueue_ring_snapshot(&mut self, reason: SnapshotReason) {
        let tick = self.tick_id;
        let payload = match self.emulator.save_state() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "save_state failed for ring snapshot");
                return;
            }
        };
        let hash = self.agent_hash();
        let bytes = snapshot::encode(tick, reason, &hash, &payload);
        let file = self.snapshots.dir().join(format!(
            "snap-{}-{}.bin",
            tick,
            reason.label()
        ));

        let Some(tx) = &self.snapshot_tx else {
            return;
        };
        match tx.try_send(SnapshotWriteJob {
            path: file.clone(),
            bytes,
        }) {
            Ok(()) => {
                self.snapshots.register(SnapshotMeta {
                    tick_id: tick,
                    reason,
                    name: None,
                    file,
                    created_at: Utc::now(),
                });
            }
            Err(_) => {
                warn!(tick, "snapshot writer queue full, dropping write");
                self.emit_event(FailsafeEvent::new(
                    FailsafeEventKind::SnapshotWriteFailed,
                    tick,
                    "writer queue full",
                ));
            }
        }
    }

    fn agent_hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.tick_id.to_le_bytes());
        hasher.update(self.session_id.as_bytes());
        hasher.update(&(self.goals_completed.len() as u64).to_le_bytes());
        *hasher.finalize().as_bytes()
    }

    fn checkpoint_strategist(&mut self) {
        let path = self
            .config
            .memory
            .sessions_dir
            .join(format!("session-{}.json", self.session_id));
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = self.strategist.checkpoint(&path) {
            warn!(%err, "strategist checkpoint failed");
        }
    }

    /// Hands the current profile map to the debounced persistor. The
    /// shutdown path persists synchronously instead.
    fn send_profile_flush(&mut self) {
        let Some(tx) = &self.profile_tx else {
            return;
        };
        let Ok(json) = self.tracker.to_json() else {
            return;
        };
        let _ = tx.try_send(ProfileFlushJob {
            path: self.config.profile.path.clone(),
            json,
            force: false,
        });
    }

    fn update_status(&mut self, path: StatePath, goal: Option<&str>, confidence: f32) {
        if let Ok(mut status) = self.handle.status.lock() {
            status.tick_id = self.tick_id;
            status.state_path = Some(path.to_string());
            status.mode = path.mode_key().map(|k| k.to_string());
            status.current_goal = goal.map(String::from);
            status.confidence = confidence;
            status.degraded = self.degraded;
        }
    }

    fn emit_event(&mut self, event: FailsafeEvent) {
        warn!(kind = ?event.kind, tick = event.tick_id, reason = %event.reason, "failsafe event");
        if let Err(err) = self.emitter.emit(&event) {
            warn!(%err, "event emit failed");
        }
        if let Ok(mut status) = self.handle.status.lock() {
            status.last_event = Some(event);
        }
    }

    fn terminal_goal_completed(&self) -> bool {
        self.planner
            .graph()
            .get("become_champion")
            .map(|g| g.status == agent_goap::GoalStatus::Completed)
            .unwrap_or(false)
    }

    /// Flushes everything that must survive the process, under a hard
    /// deadline. Overrunning the deadline downgrades the stop to fatal.
    async fn graceful_shutdown(&mut self, stop: StopReason) -> StopReason {
        let started = Instant::now();
        let tick = self.tick_id;

        self.planner.abandon_plan();
        self.press_queue.clear();
        self.tracker.flush(tick);

        if let Err(err) = self.consolidator.run(
            tick,
            &self.observer,
            &mut self.strategist,
            &mut self.tactician,
        ) {
            warn!(%err, "final consolidation failed");
        }
        self.checkpoint_strategist();
        if let Err(err) = self.tactician.compact() {
            warn!(%err, "tactician compaction failed");
        }
        if let Err(err) = self.tracker.persist(&self.config.profile.path) {
            warn!(%err, "final profile flush failed");
        }

        if !matches!(stop, StopReason::EmulatorFatal(_)) {
            let name = format!("graceful-stop-{tick}");
            self.write_named_snapshot(&name, SnapshotReason::GracefulStop, tick);
        } else {
            // Best-effort final snapshot on fatal paths too.
            let name = format!("fatal-{tick}");
            self.write_named_snapshot(&name, SnapshotReason::GracefulStop, tick);
        }

        let kind = if matches!(stop, StopReason::EmulatorFatal(_)) {
            FailsafeEventKind::EmulatorFatal
        } else {
            FailsafeEventKind::GracefulStop
        };
        self.emit_event(FailsafeEvent::new(kind, tick, format!("{stop:?}")));

        if started.elapsed() > SHUTDOWN_DEADLINE {
            self.emit_event(FailsafeEvent::new(
                FailsafeEventKind::FatalShutdown,
                tick,
                "graceful shutdown exceeded deadline",
            ));
            return StopReason::FatalShutdown;
        }
        stop
    }
}

/// Built-in Kanto badge line, HM gates, and upkeep. Real deployments extend
/// this from configuration; the chain alone is enough to drive the planner.
pub fn default_goals() -> Vec<Goal> {
    let gyms: [(&str, &str); 8] = [
        ("defeat_brock", "boulder"),
        ("defeat_misty", "cascade"),
        ("defeat_lt_surge", "thunder"),
        ("defeat_erika", "rainbow"),
        ("defeat_koga", "soul"),
        ("defeat_sabrina", "marsh"),
        ("defeat_blaine", "volcano"),
        ("defeat_giovanni", "earth"),
    ];

    let mut goals = Vec::new();
    let mut prev: Option<&str> = None;
    for (i, (id, badge)) in gyms.iter().enumerate() {
        let mut goal = Goal::new(*id, GoalCategory::Battle, 100 - i as i32)
            .with_success_when(vec![agent_goap::StateConstraint::HasBadge(
                badge.to_string(),
            )])
            .with_effects(vec![agent_goap::StateEffect::GrantBadge(badge.to_string())]);
        if let Some(prev_id) = prev {
            goal = goal.with_prereqs([prev_id]);
        }
        goals.push(goal);
        prev = Some(*id);
    }

    // HM gates: Cut opens the Vermilion gym, Surf the routes to Cinnabar.
    goals.push(
        Goal::new("obtain_cut", GoalCategory::Item, 80)
            .with_prereqs(["defeat_brock"])
            .with_success_when(vec![agent_goap::StateConstraint::HasItem(
                "hm01_cut".to_string(),
            )])
            .with_effects(vec![agent_goap::StateEffect::AddItem(
                "hm01_cut".to_string(),
                1,
            )]),
    );
    goals.push(
        Goal::new("obtain_surf", GoalCategory::Item, 70)
            .with_prereqs(["defeat_erika"])
            .with_success_when(vec![agent_goap::StateConstraint::HasItem(
                "hm03_surf".to_string(),
            )])
            .with_effects(vec![agent_goap::StateEffect::AddItem(
                "hm03_surf".to_string(),
                1,
            )]),
    );
    for (gym, gate) in [("defeat_lt_surge", "obtain_cut"), ("defeat_blaine", "obtain_surf")] {
        if let Some(goal) = goals.iter_mut().find(|g| g.id == gym) {
            goal.prereqs.insert(gate.to_string());
        }
    }

    goals.push(
        Goal::new("become_champion", GoalCategory::Milestone, 120)
            .with_prereqs(gyms.iter().map(|(id, _)| *id)),
    );
    goals.push(Goal::new(
        "keep_party_healthy",
        GoalCategory::Maintenance,
        5,
    ));
    goals
}
