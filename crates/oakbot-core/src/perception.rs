//! Perception boundary: turns a raw frame plus a WRAM window into a
//! structured observation.

use agent_core::{Observation, ObservationFlags, ScreenKind};
use thiserror::Error;

use crate::emulator::wram::WorldReading;

#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("frame unreadable: {0}")]
    Unreadable(String),
}

/// Pure function of the frame and WRAM window, plus a small internal cache
/// (previous frame hash, last sprite set).
pub trait PerceptionProvider: Send {
    fn produce(
        &mut self,
        tick_id: u64,
        screen: &[u8],
        world: &WorldReading,
    ) -> Result<Observation, PerceptionError>;

    /// Degraded-mode hint: skip optional work such as sprite re-tracking.
    fn set_degraded(&mut self, _degraded: bool) {}
}

/// Byte layout the scripted emulator and this provider agree on.
///
/// byte 0: screen kind discriminant; bytes 1-2: observation flags (LE);
/// byte 3: hp percent (0xFF = absent); bytes 4-5: cursor row/col (0xFF =
/// absent); bytes 16..80: OCR text, NUL padded.
pub struct StubPerception {
    last_hash: Option<[u8; 16]>,
}

impl Default for StubPerception {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPerception {
    pub fn new() -> Self {
        Self { last_hash: None }
    }

    pub fn last_hash(&self) -> Option<[u8; 16]> {
        self.last_hash
    }

    fn screen_kind(discriminant: u8) -> ScreenKind {
        match discriminant {
            0 => ScreenKind::Blank,
            1 => ScreenKind::Boot,
            2 => ScreenKind::Title,
            3 => ScreenKind::Menu,
            4 => ScreenKind::Dialog,
            5 => ScreenKind::Overworld,
            6 => ScreenKind::Battle,
            _ => ScreenKind::Unknown,
        }
    }
}

impl PerceptionProvider for StubPerception {
    fn produce(
        &mut self,
        tick_id: u64,
        screen: &[u8],
        world: &WorldReading,
    ) -> Result<Observation, PerceptionError> {
        if screen.len() < 80 {
            return Err(PerceptionError::Unreadable(format!(
                "frame buffer has {} bytes",
                screen.len()
            )));
        }

        let mut frame_hash = [0u8; 16];
        frame_hash.copy_from_slice(&blake3::hash(screen).as_bytes()[..16]);
        self.last_hash = Some(frame_hash);

        let kind = Self::screen_kind(screen[0]);
        let flags = ObservationFlags(u16::from_le_bytes([screen[1], screen[2]]));

        let mut obs = Observation::new(tick_id, kind, frame_hash).with_flags(flags);
        if screen[3] != 0xFF {
            obs = obs.with_hp_pct(screen[3]);
        } else if world.in_battle {
            obs = obs.with_hp_pct(world.lead_hp_pct);
        }
        if screen[4] != 0xFF && screen[5] != 0xFF {
            obs = obs.with_cursor(screen[4], screen[5]);
        }

        let text: String = screen[16..80]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect();
        if !text.is_empty() {
            obs = obs.with_ocr_text(text);
        }

        Ok(obs)
    }
}

/// Helper for tests and dry runs: encodes an observation script into the
/// stub frame layout.
pub fn encode_stub_frame(
    kind: ScreenKind,
    flags: ObservationFlags,
    hp_pct: Option<u8>,
    cursor: Option<(u8, u8)>,
    ocr: &str,
) -> Vec<u8> {
    let mut frame = vec![0u8; crate::emulator::SCREEN_BYTES];
    frame[0] = match kind {
        ScreenKind::Blank => 0,
        ScreenKind::Boot => 1,
        ScreenKind::Title => 2,
        ScreenKind::Menu => 3,
        ScreenKind::Dialog => 4,
        ScreenKind::Overworld => 5,
        ScreenKind::Battle => 6,
        ScreenKind::Unknown => 7,
    };
    let flag_bytes = flags.0.to_le_bytes();
    frame[1] = flag_bytes[0];
    frame[2] = flag_bytes[1];
    frame[3] = hp_pct.unwrap_or(0xFF);
    match cursor {
        Some((row, col)) => {
            frame[4] = row;
            frame[5] = col;
        }
        None => {
            frame[4] = 0xFF;
            frame[5] = 0xFF;
        }
    }
    for (i, b) in ocr.bytes().take(63).enumerate() {
        frame[16 + i] = b;
    }
    frame
}
