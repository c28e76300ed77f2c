use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coarse gameplay mode used by duration learning.
///
/// Distinct from the state machine's leaf states: many states share one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    Boot,
    Title,
    Menu,
    Dialog,
    Overworld,
    Battle,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Boot,
        Mode::Title,
        Mode::Menu,
        Mode::Dialog,
        Mode::Overworld,
        Mode::Battle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Boot => "boot",
            Mode::Title => "title",
            Mode::Menu => "menu",
            Mode::Dialog => "dialog",
            Mode::Overworld => "overworld",
            Mode::Battle => "battle",
        }
    }
}

/// Fine-grained slice of a mode. Each sub-mode belongs to exactly one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SubMode {
    // Boot
    Startup,
    Intro,
    // Title
    PressStart,
    SaveSelect,
    // Menu
    MainMenu,
    Party,
    Bag,
    Save,
    Shop,
    Pc,
    // Dialog
    Text,
    Choice,
    // Overworld
    Idle,
    Moving,
    Surfing,
    FieldMove,
    // Battle
    BattleIntro,
    BattleMenu,
    BattleAnim,
    BattleText,
    BattleCatch,
    BattleEnd,
}

impl SubMode {
    pub fn parent(self) -> Mode {
        match self {
            SubMode::Startup | SubMode::Intro => Mode::Boot,
            SubMode::PressStart | SubMode::SaveSelect => Mode::Title,
            SubMode::MainMenu
            | SubMode::Party
            | SubMode::Bag
            | SubMode::Save
            | SubMode::Shop
            | SubMode::Pc => Mode::Menu,
            SubMode::Text | SubMode::Choice => Mode::Dialog,
            SubMode::Idle | SubMode::Moving | SubMode::Surfing | SubMode::FieldMove => {
                Mode::Overworld
            }
            SubMode::BattleIntro
            | SubMode::BattleMenu
            | SubMode::BattleAnim
            | SubMode::BattleText
            | SubMode::BattleCatch
            | SubMode::BattleEnd => Mode::Battle,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubMode::Startup => "startup",
            SubMode::Intro => "intro",
            SubMode::PressStart => "press_start",
            SubMode::SaveSelect => "save_select",
            SubMode::MainMenu => "main_menu",
            SubMode::Party => "party",
            SubMode::Bag => "bag",
            SubMode::Save => "save",
            SubMode::Shop => "shop",
            SubMode::Pc => "pc",
            SubMode::Text => "text",
            SubMode::Choice => "choice",
            SubMode::Idle => "idle",
            SubMode::Moving => "moving",
            SubMode::Surfing => "surfing",
            SubMode::FieldMove => "field_move",
            SubMode::BattleIntro => "battle_intro",
            SubMode::BattleMenu => "battle_menu",
            SubMode::BattleAnim => "battle_anim",
            SubMode::BattleText => "battle_text",
            SubMode::BattleCatch => "battle_catch",
            SubMode::BattleEnd => "battle_end",
        }
    }
}

/// A (mode, sub-mode) pair; the unit duration profiles are keyed by.
///
/// Construction goes through [`ModeKey::new`], which rejects a sub-mode under
/// the wrong parent, so a stored key is always internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModeKey {
    mode: Mode,
    sub_mode: SubMode,
}

impl ModeKey {
    pub fn new(mode: Mode, sub_mode: SubMode) -> Option<Self> {
        if sub_mode.parent() != mode {
            return None;
        }
        Some(Self { mode, sub_mode })
    }

    pub fn of(sub_mode: SubMode) -> Self {
        Self {
            mode: sub_mode.parent(),
            sub_mode,
        }
    }

    pub fn mode(self) -> Mode {
        self.mode
    }

    pub fn sub_mode(self) -> SubMode {
        self.sub_mode
    }
}

impl fmt::Display for ModeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.mode.label(), self.sub_mode.label())
    }
}

impl core::str::FromStr for ModeKey {
    type Err = ParseModeKeyError;

    /// Parses the `mode.sub_mode` form used as a persistence key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mode_label, sub_label) = s.split_once('.').ok_or(ParseModeKeyError)?;
        let mode = Mode::ALL
            .into_iter()
            .find(|m| m.label() == mode_label)
            .ok_or(ParseModeKeyError)?;
        let sub_mode = ALL_SUB_MODES
            .into_iter()
            .find(|sm| sm.label() == sub_label)
            .ok_or(ParseModeKeyError)?;
        ModeKey::new(mode, sub_mode).ok_or(ParseModeKeyError)
    }
}

const ALL_SUB_MODES: [SubMode; 22] = [
    SubMode::Startup,
    SubMode::Intro,
    SubMode::PressStart,
    SubMode::SaveSelect,
    SubMode::MainMenu,
    SubMode::Party,
    SubMode::Bag,
    SubMode::Save,
    SubMode::Shop,
    SubMode::Pc,
    SubMode::Text,
    SubMode::Choice,
    SubMode::Idle,
    SubMode::Moving,
    SubMode::Surfing,
    SubMode::FieldMove,
    SubMode::BattleIntro,
    SubMode::BattleMenu,
    SubMode::BattleAnim,
    SubMode::BattleText,
    SubMode::BattleCatch,
    SubMode::BattleEnd,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseModeKeyError;

impl fmt::Display for ParseModeKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a `mode.sub_mode` key with known labels")
    }
}

impl std::error::Error for ParseModeKeyError {}
