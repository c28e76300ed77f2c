use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// What changed on screen between an action and the next observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDelta {
    pub hp_change: i16,
    pub dx: i16,
    pub dy: i16,
}

impl ObservedDelta {
    pub fn moved(&self) -> bool {
        self.dx != 0 || self.dy != 0
    }
}

/// One tick's outcome summary. The full observation is not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverItem {
    pub tick_id: u64,
    /// Name of the action driving this tick, if any (skip ticks have none).
    pub action: Option<String>,
    pub delta: ObservedDelta,
    pub success: bool,
}

/// Volatile FIFO tier. Bounded; appending past capacity drops the oldest.
#[derive(Debug, Clone)]
pub struct ObserverMemory {
    items: VecDeque<ObserverItem>,
    capacity: usize,
}

impl ObserverMemory {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&mut self, item: ObserverItem) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest-last view of the last `n` items.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ObserverItem> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    /// Items strictly newer than `tick_id`, oldest first.
    pub fn since(&self, tick_id: u64) -> impl Iterator<Item = &ObserverItem> {
        self.items.iter().filter(move |i| i.tick_id > tick_id)
    }

    /// Success fraction over the last `n` items that carried an action.
    /// Returns 1.0 when no such item exists.
    pub fn success_rate_last(&self, n: usize) -> f32 {
        let mut total = 0u32;
        let mut ok = 0u32;
        for item in self.recent(n) {
            if item.action.is_none() {
                continue;
            }
            total += 1;
            if item.success {
                ok += 1;
            }
        }
        if total == 0 {
            1.0
        } else {
            ok as f32 / total as f32
        }
    }

    pub fn latest(&self) -> Option<&ObserverItem> {
        self.items.back()
    }
}

impl Default for ObserverMemory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
