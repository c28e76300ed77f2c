//! Emulator port - the boundary the kernel drives the game through.

pub mod wram;

use agent_core::Button;
use thiserror::Error;

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;
pub const SCREEN_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 3;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("rom missing")]
    RomMissing,
    #[error("corrupted emulator state: {0}")]
    CorruptedState(String),
    #[error("button rejected: {0}")]
    ButtonRejected(String),
    #[error("memory unavailable at {addr:#06x}+{len}")]
    MemoryUnavailable { addr: u16, len: u16 },
}

impl EmulatorError {
    /// Errors the kernel cannot recover from in-session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EmulatorError::RomMissing | EmulatorError::CorruptedState(_)
        )
    }
}

/// The port the tick loop calls. One `tick` advances exactly one frame; the
/// screen borrow is valid only until the next `tick`.
pub trait EmulatorPort: Send {
    fn tick(&mut self) -> Result<(), EmulatorError>;
    fn screen(&self) -> &[u8];
    fn read_wram(&self, addr: u16, len: u16) -> Result<Vec<u8>, EmulatorError>;
    fn press(&mut self, button: Button, hold_ms: u16) -> Result<(), EmulatorError>;
    fn save_state(&self) -> Result<Vec<u8>, EmulatorError>;
    fn load_state(&mut self, blob: &[u8]) -> Result<(), EmulatorError>;
}

const WRAM_BASE: u16 = 0xC000;
const WRAM_SIZE: usize = 0x2000 + 0x2000; // echo through 0xDFFF plus HRAM shadow

/// Deterministic in-memory emulator used by tests and dry runs.
///
/// The screen buffer is owned by the caller between ticks via `set_screen`;
/// WRAM is a flat byte image addressed like the real hardware map.
pub struct ScriptedEmulator {
    frame: u64,
    screen: Vec<u8>,
    wram: Vec<u8>,
    presses: Vec<(u64, Button, u16)>,
    reject_presses: bool,
}

impl Default for ScriptedEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEmulator {
    pub fn new() -> Self {
        Self {
            frame: 0,
            screen: vec![0u8; SCREEN_BYTES],
            wram: vec![0u8; WRAM_SIZE],
            presses: Vec::new(),
            reject_presses: false,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn set_screen(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(SCREEN_BYTES);
        self.screen[..n].copy_from_slice(&bytes[..n]);
    }

    pub fn write_wram(&mut self, addr: u16, bytes: &[u8]) {
        let offset = (addr - WRAM_BASE) as usize;
        self.wram[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn presses(&self) -> &[(u64, Button, u16)] {
        &self.presses
    }

    pub fn press_count(&self, button: Button) -> usize {
        self.presses.iter().filter(|(_, b, _)| *b == button).count()
    }

    pub fn set_reject_presses(&mut self, reject: bool) {
        self.reject_presses = reject;
    }
}

impl EmulatorPort for ScriptedEmulator {
    fn tick(&mut self) -> Result<(), EmulatorError> {
        self.frame += 1;
        Ok(())
    }

    fn screen(&self) -> &[u8] {
        &self.screen
    }

    fn read_wram(&self, addr: u16, len: u16) -> Result<Vec<u8>, EmulatorError> {
        if addr < WRAM_BASE {
            return Err(EmulatorError::MemoryUnavailable { addr, len });
        }
        let offset = (addr - WRAM_BASE) as usize;
        let end = offset + len as usize;
        if end > self.wram.len() {
            return Err(EmulatorError::MemoryUnavailable { addr, len });
        }
        Ok(self.wram[offset..end].to_vec())
    }

    fn press(&mut self, button: Button, hold_ms: u16) -> Result<(), EmulatorError> {
        if self.reject_presses {
            return Err(EmulatorError::ButtonRejected("input disabled".into()));
        }
        self.presses.push((self.frame, button, hold_ms));
        Ok(())
    }

    fn save_state(&self) -> Result<Vec<u8>, EmulatorError> {
        let mut blob = Vec::with_capacity(8 + self.wram.len());
        blob.extend_from_slice(&self.frame.to_le_bytes());
        blob.extend_from_slice(&self.wram);
        Ok(blob)
    }

    fn load_state(&mut self, blob: &[u8]) -> Result<(), EmulatorError> {
        if blob.len() != 8 + self.wram.len() {
            return Err(EmulatorError::CorruptedState(format!(
                "state blob has {} bytes",
                blob.len()
            )));
        }
        let mut frame_bytes = [0u8; 8];
        frame_bytes.copy_from_slice(&blob[..8]);
        self.frame = u64::from_le_bytes(frame_bytes);
        self.wram.copy_from_slice(&blob[8..]);
        Ok(())
    }
}
