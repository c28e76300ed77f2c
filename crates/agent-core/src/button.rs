#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Button {
    A,
    B,
    Start,
    Select,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::Start => "START",
            Button::Select => "SELECT",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::Right => "RIGHT",
        }
    }

    /// The d-pad direction that can never be held together with this one.
    pub fn opposite(self) -> Option<Button> {
        match self {
            Button::Up => Some(Button::Down),
            Button::Down => Some(Button::Up),
            Button::Left => Some(Button::Right),
            Button::Right => Some(Button::Left),
            _ => None,
        }
    }

    pub fn is_dpad(self) -> bool {
        matches!(
            self,
            Button::Up | Button::Down | Button::Left | Button::Right
        )
    }
}

/// A single timed button event: hold for `hold_ms`, then wait `post_delay_ms`
/// before the next event may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ButtonPress {
    pub button: Button,
    pub hold_ms: u16,
    pub post_delay_ms: u16,
}

impl ButtonPress {
    pub fn new(button: Button, hold_ms: u16, post_delay_ms: u16) -> Self {
        Self {
            button,
            hold_ms,
            post_delay_ms,
        }
    }

    /// A standard short tap.
    pub fn tap(button: Button) -> Self {
        Self::new(button, 80, 50)
    }
}
