/// Fixed-interval gate for work that runs every N ticks.
///
/// The offset spreads same-interval consumers across different ticks so they
/// do not all fire on the same frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub every_ticks: u64,
    pub offset_ticks: u64,
}

impl Cadence {
    pub fn every(every_ticks: u64) -> Self {
        Self {
            every_ticks: every_ticks.max(1),
            offset_ticks: 0,
        }
    }

    pub fn with_offset(mut self, offset_ticks: u64) -> Self {
        self.offset_ticks = offset_ticks % self.every_ticks;
        self
    }

    pub fn is_due(&self, tick: u64) -> bool {
        let every = self.every_ticks.max(1);
        ((tick + self.offset_ticks) % every) == 0
    }
}
