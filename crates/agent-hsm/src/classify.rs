use core::fmt;

use agent_core::{Observation, ObservationFlags, ScreenKind};

use crate::path::StatePath;
use crate::state::{Category, GameState};
use crate::table::TransitionTable;

/// Result of classifying one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub path: StatePath,
    pub confidence: f32,
    /// Set when the raw candidate was rejected by the transition table and
    /// the path was degraded to `TRANSITION.AMBIGUOUS`.
    pub ambiguous: bool,
}

/// A state-path edge observed between two ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEvent {
    pub tick_id: u64,
    pub from: Option<StatePath>,
    pub to: StatePath,
    pub legal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HsmError {
    /// Observations must arrive with strictly increasing tick ids.
    NonMonotonicTick { prev: u64, got: u64 },
}

impl fmt::Display for HsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HsmError::NonMonotonicTick { prev, got } => {
                write!(f, "tick id {got} is not greater than previous {prev}")
            }
        }
    }
}

impl std::error::Error for HsmError {}

type TransitionCallback = Box<dyn FnMut(&TransitionEvent) + Send>;

/// The hierarchical state machine.
///
/// `classify` runs on the tick hot path; subscriber notification is deferred
/// until `flush_events`, which the scheduler calls between ticks.
pub struct Hsm {
    table: TransitionTable,
    ambiguity_threshold: f32,
    prev_path: Option<StatePath>,
    prev_tick: Option<u64>,
    low_confidence_streak: u32,
    pending_events: Vec<TransitionEvent>,
    subscribers: Vec<TransitionCallback>,
}

impl Hsm {
    pub const DEFAULT_AMBIGUITY_THRESHOLD: f32 = 0.5;
    const AMBIGUITY_STREAK_LIMIT: u32 = 3;

    pub fn new(ambiguity_threshold: f32) -> Self {
        Self {
            table: TransitionTable::new(),
            ambiguity_threshold,
            prev_path: None,
            prev_tick: None,
            low_confidence_streak: 0,
            pending_events: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn current_path(&self) -> Option<StatePath> {
        self.prev_path
    }

    pub fn legal_transition(&self, prev: StatePath, next: StatePath) -> bool {
        self.table.legal(prev.leaf(), next.leaf())
    }

    /// Registers a transition subscriber, invoked from `flush_events`.
    pub fn on_transition(&mut self, cb: impl FnMut(&TransitionEvent) + Send + 'static) {
        self.subscribers.push(Box::new(cb));
    }

    /// Delivers queued transition events. Must not be called mid-tick.
    pub fn flush_events(&mut self) {
        for event in self.pending_events.drain(..) {
            for sub in self.subscribers.iter_mut() {
                sub(&event);
            }
        }
    }

    /// Classifies one observation into a legal state path.
    ///
    /// An illegal raw candidate degrades to `TRANSITION.AMBIGUOUS` with
    /// halved confidence. Three consecutive sub-threshold classifications
    /// escalate to `EMERGENCY.AMBIGUOUS_STATE`.
    pub fn classify(&mut self, obs: &Observation) -> Result<Classification, HsmError> {
        if let Some(prev_tick) = self.prev_tick {
            if obs.tick_id <= prev_tick {
                return Err(HsmError::NonMonotonicTick {
                    prev: prev_tick,
                    got: obs.tick_id,
                });
            }
        }
        self.prev_tick = Some(obs.tick_id);

        let (candidate, mut confidence) = decide(obs, self.prev_path);
        let mut path = StatePath::new(candidate);
        let mut ambiguous = false;

        let legal = match self.prev_path {
            Some(prev) => self.table.legal(prev.leaf(), candidate),
            None => true,
        };
        if !legal {
            confidence *= 0.5;
            path = StatePath::new(GameState::TransitionAmbiguous);
            ambiguous = true;
        }

        if confidence < self.ambiguity_threshold {
            self.low_confidence_streak += 1;
        } else {
            self.low_confidence_streak = 0;
        }
        if self.low_confidence_streak >= Self::AMBIGUITY_STREAK_LIMIT {
            path = StatePath::new(GameState::AmbiguousState);
        }

        if path.changed_from(self.prev_path) {
            self.pending_events.push(TransitionEvent {
                tick_id: obs.tick_id,
                from: self.prev_path,
                to: path,
                legal,
            });
        }
        self.prev_path = Some(path);

        Ok(Classification {
            path,
            confidence,
            ambiguous,
        })
    }

    /// Forces the machine into an emergency state without an observation.
    /// Used by recovery when it overrides the pipeline.
    pub fn force_emergency(&mut self, state: GameState, tick_id: u64) {
        debug_assert_eq!(state.category(), Category::Emergency);
        let path = StatePath::new(state);
        if path.changed_from(self.prev_path) {
            self.pending_events.push(TransitionEvent {
                tick_id,
                from: self.prev_path,
                to: path,
                legal: true,
            });
        }
        self.prev_path = Some(path);
    }
}

/// The decision tree: screen kind first, then flags and OCR markers.
fn decide(obs: &Observation, prev: Option<StatePath>) -> (GameState, f32) {
    match obs.screen_kind {
        ScreenKind::Blank => decide_blank(prev),
        ScreenKind::Boot => decide_boot(obs),
        ScreenKind::Title => decide_title(obs),
        ScreenKind::Menu => decide_menu(obs),
        ScreenKind::Dialog => decide_dialog(obs),
        ScreenKind::Overworld => decide_overworld(obs, prev),
        ScreenKind::Battle => decide_battle(obs, prev),
        ScreenKind::Unknown => (GameState::TransitionAmbiguous, 0.3),
    }
}

fn decide_blank(prev: Option<StatePath>) -> (GameState, f32) {
    match prev {
        Some(p) if p.category() == Category::Boot => (GameState::Initialize, 0.8),
        Some(_) => (GameState::FadeOut, 0.7),
        None => (GameState::Initialize, 0.9),
    }
}

fn decide_boot(obs: &Observation) -> (GameState, f32) {
    if obs.ocr_contains("OAK") {
        (GameState::OakSpeech, 0.9)
    } else if obs.ocr_contains("GAME FREAK") || obs.ocr_contains("NINTENDO") {
        (GameState::CopyrightScreen, 0.9)
    } else if obs.has_flag(ObservationFlags::SPRITE_MOTION) {
        (GameState::IntroCutscene, 0.8)
    } else {
        (GameState::Initialize, 0.7)
    }
}

fn decide_title(obs: &Observation) -> (GameState, f32) {
    if obs.ocr_contains("OPTION") && obs.has_flag(ObservationFlags::CURSOR_VISIBLE) {
        if let Some((row, _)) = obs.cursor {
            return match row {
                0 => (GameState::ContinueGame, 0.8),
                1 => (GameState::NewGame, 0.8),
                _ => (GameState::TitleOptions, 0.8),
            };
        }
        return (GameState::TitleMenu, 0.8);
    }
    if obs.has_flag(ObservationFlags::CURSOR_VISIBLE) {
        (GameState::TitleMenu, 0.75)
    } else if obs.ocr_contains("START") {
        (GameState::PressStart, 0.95)
    } else {
        (GameState::PressStart, 0.6)
    }
}

fn decide_menu(obs: &Observation) -> (GameState, f32) {
    let overlay = obs.has_flag(ObservationFlags::MENU_OVERLAY);

    if obs.ocr_contains("HOW MANY") {
        return (GameState::ShopQuantity, 0.9);
    }
    if obs.ocr_contains("BUY") {
        return (GameState::ShopBuy, 0.85);
    }
    if obs.ocr_contains("SELL") {
        return (GameState::ShopSell, 0.85);
    }
    if obs.ocr_contains("WITHDRAW") || obs.ocr_contains("DEPOSIT") {
        return (GameState::PcBoxView, 0.85);
    }
    if obs.ocr_contains("PC") {
        return (GameState::PcMenu, 0.8);
    }
    if obs.ocr_contains("SAVING") {
        return (GameState::SavingGame, 0.9);
    }
    if obs.ocr_contains("SAVE") {
        return (GameState::SaveConfirm, 0.85);
    }
    if obs.ocr_contains("POKEDEX") {
        let state = if overlay {
            GameState::PokedexEntry
        } else {
            GameState::PokedexList
        };
        return (state, 0.85);
    }
    if obs.ocr_contains("CHOOSE A POKEMON") || obs.ocr_contains("BRING OUT") {
        let state = if overlay {
            GameState::PartyDetail
        } else {
            GameState::PartyOverview
        };
        return (state, 0.85);
    }
    if obs.ocr_contains("ITEM") {
        let state = if overlay {
            GameState::BagItemSelect
        } else {
            GameState::BagList
        };
        return (state, 0.85);
    }
    if obs.ocr_contains("BADGES") || obs.ocr_contains("TRAINER") {
        return (GameState::TrainerCard, 0.8);
    }
    if obs.ocr_contains("TEXT SPEED") {
        return (GameState::OptionsSettings, 0.85);
    }
    (GameState::StartMenu, 0.7)
}

fn decide_dialog(obs: &Observation) -> (GameState, f32) {
    if obs.has_flag(ObservationFlags::CURSOR_VISIBLE) {
        if obs.ocr_contains("YES") && obs.ocr_contains("NO") {
            return (GameState::ChoiceYesNo, 0.9);
        }
        return (GameState::ChoiceMulti, 0.8);
    }
    if obs.ocr_contains("RECEIVED") || obs.ocr_contains("OBTAINED") {
        return (GameState::ItemReceived, 0.85);
    }
    if obs.ocr_contains("NICKNAME") {
        return (GameState::NicknamePrompt, 0.85);
    }
    if obs.sprites.is_empty() {
        // Signs and system boxes render without an interlocutor sprite.
        if obs.ocr_contains("SIGN") || obs.ocr_contains("NOTICE") {
            return (GameState::SignText, 0.75);
        }
        return (GameState::SystemText, 0.7);
    }
    (GameState::NpcText, 0.8)
}

fn decide_overworld(obs: &Observation, prev: Option<StatePath>) -> (GameState, f32) {
    if obs.has_flag(ObservationFlags::SCREEN_FADING) {
        return (GameState::EnteringWarp, 0.75);
    }
    if matches!(
        prev.map(|p| p.leaf()),
        Some(GameState::MapLoad) | Some(GameState::EnteringWarp)
    ) {
        return (GameState::ExitingWarp, 0.8);
    }
    if obs.has_flag(ObservationFlags::SURF_SPRITE) {
        return (GameState::Surfing, 0.85);
    }
    if obs.has_flag(ObservationFlags::BIKE_SPRITE) {
        return (GameState::Biking, 0.85);
    }
    if obs.ocr_contains("FISHING") || obs.ocr_contains("NOT EVEN A NIBBLE") {
        return (GameState::Fishing, 0.85);
    }
    if obs.ocr_contains("USED") {
        return (GameState::UsingFieldMove, 0.8);
    }
    if obs.has_flag(ObservationFlags::SPRITE_MOTION) {
        return (GameState::Walking, 0.85);
    }
    (GameState::Idle, 0.9)
}

fn decide_battle(obs: &Observation, prev: Option<StatePath>) -> (GameState, f32) {
    if obs.has_flag(ObservationFlags::BATTLE_INTRO) {
        if obs.ocr_contains("WILD") {
            return (GameState::WildIntro, 0.9);
        }
        return (GameState::TrainerIntro, 0.85);
    }
    if obs.ocr_contains("CAUGHT") {
        return (GameState::CatchSuccess, 0.9);
    }
    if obs.ocr_contains("THREW") || obs.ocr_contains("BALL") {
        return (GameState::CatchAttempt, 0.8);
    }
    if obs.ocr_contains("ENEMY") && obs.ocr_contains("FAINTED") {
        return (GameState::EnemyFainted, 0.9);
    }
    if obs.ocr_contains("FAINTED") {
        return (GameState::AllyFainted, 0.85);
    }
    if obs.ocr_contains("GAINED") {
        return (GameState::ExperienceGain, 0.9);
    }
    if obs.ocr_contains("GREW TO LEVEL") {
        return (GameState::LevelUp, 0.9);
    }
    if obs.ocr_contains("EVOLVING") || obs.ocr_contains("CONGRATULATIONS") {
        return (GameState::EvolutionScene, 0.85);
    }
    if obs.ocr_contains("DEFEATED") || obs.ocr_contains("YOU WON") {
        return (GameState::VictoryText, 0.85);
    }
    if obs.ocr_contains("BLACKED OUT") {
        return (GameState::DefeatText, 0.9);
    }
    if obs.ocr_contains("GOT AWAY") || obs.ocr_contains("CAN'T ESCAPE") {
        return (GameState::RunAttempt, 0.85);
    }
    if obs.has_flag(ObservationFlags::CURSOR_VISIBLE) {
        if obs.ocr_contains("FIGHT") {
            return (GameState::CommandMenu, 0.9);
        }
        if obs.ocr_contains("PP") {
            return (GameState::MoveSelect, 0.85);
        }
        if obs.ocr_contains("CHOOSE A POKEMON") {
            return (GameState::SwitchSelect, 0.85);
        }
        if obs.ocr_contains("ITEM") {
            return (GameState::BattleBag, 0.8);
        }
        return (GameState::CommandMenu, 0.6);
    }
    if obs.has_flag(ObservationFlags::SCREEN_FADING) {
        return (GameState::BattleOver, 0.75);
    }
    if obs.has_flag(ObservationFlags::SPRITE_MOTION) {
        return (GameState::AttackAnimation, 0.75);
    }
    if obs.ocr_text.is_some() && obs.has_flag(ObservationFlags::HP_BARS_VISIBLE) {
        return (GameState::DamageText, 0.7);
    }
    match prev.map(|p| p.leaf()) {
        Some(state) if state.category() == Category::Battle => (state, 0.55),
        _ => (GameState::StatusText, 0.5),
    }
}
