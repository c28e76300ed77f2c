#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coarse screen classification produced by perception, before the state
/// machine refines it into a full state path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScreenKind {
    Blank,
    Boot,
    Title,
    Menu,
    Dialog,
    Overworld,
    Battle,
    Unknown,
}

/// Raw per-frame flags reported by perception.
///
/// Plain bitset over `u16`; the named constants below are the full vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationFlags(pub u16);

impl ObservationFlags {
    pub const DIALOG_PRESENT: Self = Self(1 << 0);
    pub const CURSOR_VISIBLE: Self = Self(1 << 1);
    pub const HP_BARS_VISIBLE: Self = Self(1 << 2);
    pub const MENU_OVERLAY: Self = Self(1 << 3);
    pub const BATTLE_INTRO: Self = Self(1 << 4);
    pub const LOW_HP_ALERT: Self = Self(1 << 5);
    pub const SCREEN_FADING: Self = Self(1 << 6);
    pub const SPRITE_MOTION: Self = Self(1 << 7);
    pub const SURF_SPRITE: Self = Self(1 << 8);
    pub const BIKE_SPRITE: Self = Self(1 << 9);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// A recognized on-screen sprite with its tile position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sprite {
    pub id: u16,
    pub x: u8,
    pub y: u8,
}

/// One tick's structured perception result.
///
/// Produced once per tick and consumed by the state machine; the observer
/// memory tier stores a summary, not the observation itself.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    pub tick_id: u64,
    pub screen_kind: ScreenKind,
    pub ocr_text: Option<String>,
    pub sprites: Vec<Sprite>,
    hp_pct: Option<u8>,
    pub cursor: Option<(u8, u8)>,
    pub frame_hash: [u8; 16],
    pub flags: ObservationFlags,
}

impl Observation {
    pub fn new(tick_id: u64, screen_kind: ScreenKind, frame_hash: [u8; 16]) -> Self {
        Self {
            tick_id,
            screen_kind,
            ocr_text: None,
            sprites: Vec::new(),
            hp_pct: None,
            cursor: None,
            frame_hash,
            flags: ObservationFlags::empty(),
        }
    }

    pub fn with_ocr_text(mut self, text: impl Into<String>) -> Self {
        self.ocr_text = Some(text.into());
        self
    }

    pub fn with_sprites(mut self, sprites: Vec<Sprite>) -> Self {
        self.sprites = sprites;
        self
    }

    /// Values above 100 are clamped; the field never leaves its range.
    pub fn with_hp_pct(mut self, pct: u8) -> Self {
        self.hp_pct = Some(pct.min(100));
        self
    }

    pub fn with_cursor(mut self, row: u8, col: u8) -> Self {
        self.cursor = Some((row, col));
        self
    }

    pub fn with_flags(mut self, flags: ObservationFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn hp_pct(&self) -> Option<u8> {
        self.hp_pct
    }

    pub fn has_flag(&self, flag: ObservationFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Case-insensitive OCR marker check.
    pub fn ocr_contains(&self, marker: &str) -> bool {
        self.ocr_text
            .as_deref()
            .map(|t| t.to_ascii_uppercase().contains(&marker.to_ascii_uppercase()))
            .unwrap_or(false)
    }
}
