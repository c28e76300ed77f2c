#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use agent_core::{Mode, ModeKey, SubMode};

/// Category roots of the state hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Category {
    Boot,
    Title,
    Menu,
    Dialog,
    Overworld,
    Battle,
    Emergency,
    Transition,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Boot => "BOOT",
            Category::Title => "TITLE",
            Category::Menu => "MENU",
            Category::Dialog => "DIALOG",
            Category::Overworld => "OVERWORLD",
            Category::Battle => "BATTLE",
            Category::Emergency => "EMERGENCY",
            Category::Transition => "TRANSITION",
        }
    }
}

/// Intermediate grouping node between a category and its leaves.
///
/// Only some leaves sit under a group; the rest hang directly off the
/// category, so paths are two or three nodes deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum StateGroup {
    Party,
    Bag,
    Pokedex,
    Pc,
    Shop,
    Choice,
    BattleIntro,
    Command,
    Resolve,
}

impl StateGroup {
    pub fn label(self) -> &'static str {
        match self {
            StateGroup::Party => "PARTY",
            StateGroup::Bag => "BAG",
            StateGroup::Pokedex => "POKEDEX",
            StateGroup::Pc => "PC",
            StateGroup::Shop => "SHOP",
            StateGroup::Choice => "CHOICE",
            StateGroup::BattleIntro => "INTRO",
            StateGroup::Command => "COMMAND",
            StateGroup::Resolve => "RESOLVE",
        }
    }
}

/// Leaf states. Dense `u8` indices drive the transition table; stable string
/// ids (`id()`) are what logging and persistence use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum GameState {
    // BOOT
    Initialize,
    CopyrightScreen,
    IntroCutscene,
    OakSpeech,
    // TITLE
    PressStart,
    TitleMenu,
    NewGame,
    ContinueGame,
    TitleOptions,
    // MENU
    StartMenu,
    PokedexList,
    PokedexEntry,
    PartyOverview,
    PartyDetail,
    BagList,
    BagItemSelect,
    TrainerCard,
    SaveConfirm,
    SavingGame,
    OptionsSettings,
    PcMenu,
    PcBoxView,
    ShopBuy,
    ShopSell,
    ShopQuantity,
    // DIALOG
    NpcText,
    SignText,
    SystemText,
    ChoiceYesNo,
    ChoiceMulti,
    ItemReceived,
    NicknamePrompt,
    // OVERWORLD
    Idle,
    Walking,
    Surfing,
    Biking,
    Fishing,
    UsingFieldMove,
    EnteringWarp,
    ExitingWarp,
    // BATTLE
    WildIntro,
    TrainerIntro,
    CommandMenu,
    MoveSelect,
    SwitchSelect,
    BattleBag,
    AttackAnimation,
    DamageText,
    StatusText,
    ExperienceGain,
    LevelUp,
    EvolutionScene,
    CatchAttempt,
    CatchSuccess,
    AllyFainted,
    EnemyFainted,
    VictoryText,
    DefeatText,
    RunAttempt,
    BattleOver,
    // EMERGENCY
    AmbiguousState,
    SoftlockDetected,
    RecoveryPending,
    HardResetPending,
    ShutdownPending,
    // TRANSITION
    TransitionAmbiguous,
    FadeOut,
    FadeIn,
    MapLoad,
    BattleEnter,
    BattleExit,
}

impl GameState {
    pub const COUNT: usize = 71;

    pub const ALL: [GameState; Self::COUNT] = [
        GameState::Initialize,
        GameState::CopyrightScreen,
        GameState::IntroCutscene,
        GameState::OakSpeech,
        GameState::PressStart,
        GameState::TitleMenu,
        GameState::NewGame,
        GameState::ContinueGame,
        GameState::TitleOptions,
        GameState::StartMenu,
        GameState::PokedexList,
        GameState::PokedexEntry,
        GameState::PartyOverview,
        GameState::PartyDetail,
        GameState::BagList,
        GameState::BagItemSelect,
        GameState::TrainerCard,
        GameState::SaveConfirm,
        GameState::SavingGame,
        GameState::OptionsSettings,
        GameState::PcMenu,
        GameState::PcBoxView,
        GameState::ShopBuy,
        GameState::ShopSell,
        GameState::ShopQuantity,
        GameState::NpcText,
        GameState::SignText,
        GameState::SystemText,
        GameState::ChoiceYesNo,
        GameState::ChoiceMulti,
        GameState::ItemReceived,
        GameState::NicknamePrompt,
        GameState::Idle,
        GameState::Walking,
        GameState::Surfing,
        GameState::Biking,
        GameState::Fishing,
        GameState::UsingFieldMove,
        GameState::EnteringWarp,
        GameState::ExitingWarp,
        GameState::WildIntro,
        GameState::TrainerIntro,
        GameState::CommandMenu,
        GameState::MoveSelect,
        GameState::SwitchSelect,
        GameState::BattleBag,
        GameState::AttackAnimation,
        GameState::DamageText,
        GameState::StatusText,
        GameState::ExperienceGain,
        GameState::LevelUp,
        GameState::EvolutionScene,
        GameState::CatchAttempt,
        GameState::CatchSuccess,
        GameState::AllyFainted,
        GameState::EnemyFainted,
        GameState::VictoryText,
        GameState::DefeatText,
        GameState::RunAttempt,
        GameState::BattleOver,
        GameState::AmbiguousState,
        GameState::SoftlockDetected,
        GameState::RecoveryPending,
        GameState::HardResetPending,
        GameState::ShutdownPending,
        GameState::TransitionAmbiguous,
        GameState::FadeOut,
        GameState::FadeIn,
        GameState::MapLoad,
        GameState::BattleEnter,
        GameState::BattleExit,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn category(self) -> Category {
        use GameState::*;
        match self {
            Initialize | CopyrightScreen | IntroCutscene | OakSpeech => Category::Boot,
            PressStart | TitleMenu | NewGame | ContinueGame | TitleOptions => Category::Title,
            StartMenu | PokedexList | PokedexEntry | PartyOverview | PartyDetail | BagList
            | BagItemSelect | TrainerCard | SaveConfirm | SavingGame | OptionsSettings | PcMenu
            | PcBoxView | ShopBuy | ShopSell | ShopQuantity => Category::Menu,
            NpcText | SignText | SystemText | ChoiceYesNo | ChoiceMulti | ItemReceived
            | NicknamePrompt => Category::Dialog,
            Idle | Walking | Surfing | Biking | Fishing | UsingFieldMove | EnteringWarp
            | ExitingWarp => Category::Overworld,
            WildIntro | TrainerIntro | CommandMenu | MoveSelect | SwitchSelect | BattleBag
            | AttackAnimation | DamageText | StatusText | ExperienceGain | LevelUp
            | EvolutionScene | CatchAttempt | CatchSuccess | AllyFainted | EnemyFainted
            | VictoryText | DefeatText | RunAttempt | BattleOver => Category::Battle,
            AmbiguousState | SoftlockDetected | RecoveryPending | HardResetPending
            | ShutdownPending => Category::Emergency,
            TransitionAmbiguous | FadeOut | FadeIn | MapLoad | BattleEnter | BattleExit => {
                Category::Transition
            }
        }
    }

    pub fn group(self) -> Option<StateGroup> {
        use GameState::*;
        match self {
            PartyOverview | PartyDetail => Some(StateGroup::Party),
            BagList | BagItemSelect => Some(StateGroup::Bag),
            PokedexList | PokedexEntry => Some(StateGroup::Pokedex),
            PcMenu | PcBoxView => Some(StateGroup::Pc),
            ShopBuy | ShopSell | ShopQuantity => Some(StateGroup::Shop),
            ChoiceYesNo | ChoiceMulti => Some(StateGroup::Choice),
            WildIntro | TrainerIntro => Some(StateGroup::BattleIntro),
            CommandMenu | MoveSelect | SwitchSelect | BattleBag => Some(StateGroup::Command),
            ExperienceGain | LevelUp | EvolutionScene | CatchAttempt | CatchSuccess
            | AllyFainted | EnemyFainted | VictoryText | DefeatText | RunAttempt | BattleOver => {
                Some(StateGroup::Resolve)
            }
            _ => None,
        }
    }

    /// Duration-learning key for this state. Emergency and transition states
    /// carry no mode; a dwell window stays open across them.
    pub fn mode_key(self) -> Option<ModeKey> {
        use GameState::*;
        let sub = match self {
            Initialize | CopyrightScreen => SubMode::Startup,
            IntroCutscene | OakSpeech => SubMode::Intro,
            PressStart => SubMode::PressStart,
            TitleMenu | NewGame | ContinueGame | TitleOptions => SubMode::SaveSelect,
            StartMenu | TrainerCard | OptionsSettings | PokedexList | PokedexEntry => {
                SubMode::MainMenu
            }
            PartyOverview | PartyDetail => SubMode::Party,
            BagList | BagItemSelect => SubMode::Bag,
            SaveConfirm | SavingGame => SubMode::Save,
            PcMenu | PcBoxView => SubMode::Pc,
            ShopBuy | ShopSell | ShopQuantity => SubMode::Shop,
            NpcText | SignText | SystemText | ItemReceived | NicknamePrompt => SubMode::Text,
            ChoiceYesNo | ChoiceMulti => SubMode::Choice,
            Idle => SubMode::Idle,
            Walking | Biking | EnteringWarp | ExitingWarp => SubMode::Moving,
            Surfing => SubMode::Surfing,
            Fishing | UsingFieldMove => SubMode::FieldMove,
            WildIntro | TrainerIntro => SubMode::BattleIntro,
            CommandMenu | MoveSelect | SwitchSelect | BattleBag => SubMode::BattleMenu,
            AttackAnimation => SubMode::BattleAnim,
            DamageText | StatusText | ExperienceGain | LevelUp | EvolutionScene | AllyFainted
            | EnemyFainted | VictoryText | DefeatText | RunAttempt => SubMode::BattleText,
            CatchAttempt | CatchSuccess => SubMode::BattleCatch,
            BattleOver => SubMode::BattleEnd,
            AmbiguousState | SoftlockDetected | RecoveryPending | HardResetPending
            | ShutdownPending | TransitionAmbiguous | FadeOut | FadeIn | MapLoad | BattleEnter
            | BattleExit => return None,
        };
        Some(ModeKey::of(sub))
    }

    pub fn mode(self) -> Option<Mode> {
        self.mode_key().map(|k| k.mode())
    }

    /// Stable string id, `CATEGORY.LEAF`.
    pub fn id(self) -> &'static str {
        use GameState::*;
        match self {
            Initialize => "BOOT.INITIALIZE",
            CopyrightScreen => "BOOT.COPYRIGHT_SCREEN",
            IntroCutscene => "BOOT.INTRO_CUTSCENE",
            OakSpeech => "BOOT.OAK_SPEECH",
            PressStart => "TITLE.PRESS_START",
            TitleMenu => "TITLE.MENU",
            NewGame => "TITLE.NEW_GAME",
            ContinueGame => "TITLE.CONTINUE_GAME",
            TitleOptions => "TITLE.OPTIONS",
            StartMenu => "MENU.START_MENU",
            PokedexList => "MENU.POKEDEX_LIST",
            PokedexEntry => "MENU.POKEDEX_ENTRY",
            PartyOverview => "MENU.PARTY_OVERVIEW",
            PartyDetail => "MENU.PARTY_DETAIL",
            BagList => "MENU.BAG_LIST",
            BagItemSelect => "MENU.BAG_ITEM_SELECT",
            TrainerCard => "MENU.TRAINER_CARD",
            SaveConfirm => "MENU.SAVE_CONFIRM",
            SavingGame => "MENU.SAVING_GAME",
            OptionsSettings => "MENU.OPTIONS_SETTINGS",
            PcMenu => "MENU.PC_MENU",
            PcBoxView => "MENU.PC_BOX_VIEW",
            ShopBuy => "MENU.SHOP_BUY",
            ShopSell => "MENU.SHOP_SELL",
            ShopQuantity => "MENU.SHOP_QUANTITY",
            NpcText => "DIALOG.NPC_TEXT",
            SignText => "DIALOG.SIGN_TEXT",
            SystemText => "DIALOG.SYSTEM_TEXT",
            ChoiceYesNo => "DIALOG.CHOICE_YES_NO",
            ChoiceMulti => "DIALOG.CHOICE_MULTI",
            ItemReceived => "DIALOG.ITEM_RECEIVED",
            NicknamePrompt => "DIALOG.NICKNAME_PROMPT",
            Idle => "OVERWORLD.IDLE",
            Walking => "OVERWORLD.WALKING",
            Surfing => "OVERWORLD.SURFING",
            Biking => "OVERWORLD.BIKING",
            Fishing => "OVERWORLD.FISHING",
            UsingFieldMove => "OVERWORLD.USING_FIELD_MOVE",
            EnteringWarp => "OVERWORLD.ENTERING_WARP",
            ExitingWarp => "OVERWORLD.EXITING_WARP",
            WildIntro => "BATTLE.WILD_INTRO",
            TrainerIntro => "BATTLE.TRAINER_INTRO",
            CommandMenu => "BATTLE.COMMAND_MENU",
            MoveSelect => "BATTLE.MOVE_SELECT",
            SwitchSelect => "BATTLE.SWITCH_SELECT",
            BattleBag => "BATTLE.BAG",
            AttackAnimation => "BATTLE.ATTACK_ANIMATION",
            DamageText => "BATTLE.DAMAGE_TEXT",
            StatusText => "BATTLE.STATUS_TEXT",
            ExperienceGain => "BATTLE.EXPERIENCE_GAIN",
            LevelUp => "BATTLE.LEVEL_UP",
            EvolutionScene => "BATTLE.EVOLUTION_SCENE",
            CatchAttempt => "BATTLE.CATCH_ATTEMPT",
            CatchSuccess => "BATTLE.CATCH_SUCCESS",
            AllyFainted => "BATTLE.ALLY_FAINTED",
            EnemyFainted => "BATTLE.ENEMY_FAINTED",
            VictoryText => "BATTLE.VICTORY_TEXT",
            DefeatText => "BATTLE.DEFEAT_TEXT",
            RunAttempt => "BATTLE.RUN_ATTEMPT",
            BattleOver => "BATTLE.OVER",
            AmbiguousState => "EMERGENCY.AMBIGUOUS_STATE",
            SoftlockDetected => "EMERGENCY.SOFTLOCK_DETECTED",
            RecoveryPending => "EMERGENCY.RECOVERY_PENDING",
            HardResetPending => "EMERGENCY.HARD_RESET_PENDING",
            ShutdownPending => "EMERGENCY.SHUTDOWN_PENDING",
            TransitionAmbiguous => "TRANSITION.AMBIGUOUS",
            FadeOut => "TRANSITION.FADE_OUT",
            FadeIn => "TRANSITION.FADE_IN",
            MapLoad => "TRANSITION.MAP_LOAD",
            BattleEnter => "TRANSITION.BATTLE_ENTER",
            BattleExit => "TRANSITION.BATTLE_EXIT",
        }
    }
}
