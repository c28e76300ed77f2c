//! Per-mode duration profiles and the dwell tracker that learns them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use agent_core::ModeKey;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const PROFILE_SCHEMA: u32 = 1;

/// Decayed 32-bucket histogram over geometrically spaced duration buckets;
/// tracks the tail so p95 survives regime shifts without unbounded memory.
#[derive(Debug, Clone, PartialEq)]
pub struct TailHistogram {
    counts: [f64; Self::BUCKETS],
}

impl TailHistogram {
    const BUCKETS: usize = 32;
    /// Lower edge of bucket 0, in milliseconds.
    const MIN_MS: f64 = 16.0;
    /// Geometric bucket growth factor.
    const GROWTH: f64 = 1.4;
    /// Per-insert decay applied to all counts.
    const DECAY: f64 = 0.995;

    fn new() -> Self {
        Self {
            counts: [0.0; Self::BUCKETS],
        }
    }

    fn bucket_for(ms: f64) -> usize {
        if ms <= Self::MIN_MS {
            return 0;
        }
        let idx = (ms / Self::MIN_MS).log(Self::GROWTH).floor() as usize;
        idx.min(Self::BUCKETS - 1)
    }

    fn upper_edge(bucket: usize) -> f64 {
        Self::MIN_MS * Self::GROWTH.powi(bucket as i32 + 1)
    }

    fn add(&mut self, ms: f64) {
        for count in self.counts.iter_mut() {
            *count *= Self::DECAY;
        }
        self.counts[Self::bucket_for(ms)] += 1.0;
    }

    fn quantile(&self, q: f64) -> f64 {
        let total: f64 = self.counts.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let target = total * q;
        let mut cumulative = 0.0;
        for (i, count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return Self::upper_edge(i);
            }
        }
        Self::upper_edge(Self::BUCKETS - 1)
    }
}

impl Default for TailHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Learned duration statistics for one (mode, sub-mode).
///
/// Only the summary fields persist; the tail histogram is rebuilt in memory
/// across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationProfile {
    pub mean_ms: f64,
    pub var_ms: f64,
    pub p95_ms: f64,
    pub samples: u64,
    #[serde(skip, default)]
    histogram: TailHistogram,
}

impl Default for DurationProfile {
    fn default() -> Self {
        Self {
            mean_ms: 0.0,
            var_ms: 0.0,
            p95_ms: 0.0,
            samples: 0,
            histogram: TailHistogram::new(),
        }
    }
}

impl DurationProfile {
    /// Folds one dwell sample in. Samples beyond five times the learned p95
    /// are clipped for outlier resilience.
    pub fn update(&mut self, sample_ms: f64, alpha: f64) {
        let clipped = if self.p95_ms > 0.0 {
            sample_ms.min(5.0 * self.p95_ms)
        } else {
            sample_ms
        };

        if self.samples == 0 {
            self.mean_ms = clipped;
            self.var_ms = 0.0;
        } else {
            let prev_mean = self.mean_ms;
            self.mean_ms = (1.0 - alpha) * self.mean_ms + alpha * clipped;
            let deviation = clipped - prev_mean;
            self.var_ms = (1.0 - alpha) * (self.var_ms + alpha * deviation * deviation);
        }
        self.histogram.add(clipped);
        self.p95_ms = self.histogram.quantile(0.95).max(self.mean_ms);
        self.samples += 1;
    }

    pub fn std_dev_ms(&self) -> f64 {
        self.var_ms.max(0.0).sqrt()
    }

    pub fn is_warm(&self, n_min: u64) -> bool {
        self.samples >= n_min
    }
}

/// A closed dwell window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: ModeKey,
    pub to: Option<ModeKey>,
    pub dwell_ms: u64,
    pub closed_at_tick: u64,
}

#[derive(Debug, Clone, Copy)]
struct DwellWindow {
    key: ModeKey,
    start_tick: u64,
}

/// Tracks the open dwell window per mode and learns duration profiles.
///
/// Transition and emergency states carry no mode key; they leave the current
/// window open rather than closing it.
#[derive(Debug)]
pub struct ModeDurationTracker {
    profiles: BTreeMap<String, DurationProfile>,
    cumulative_ms: BTreeMap<String, u64>,
    open: Option<DwellWindow>,
    alpha: f64,
    n_min: u64,
    tick_ms: u64,
}

impl ModeDurationTracker {
    pub fn new(alpha: f64, n_min: u64, tick_ms: u64) -> Self {
        Self {
            profiles: BTreeMap::new(),
            cumulative_ms: BTreeMap::new(),
            open: None,
            alpha,
            n_min,
            tick_ms: tick_ms.max(1),
        }
    }

    /// Feeds this tick's mode key in; returns the closed window on change.
    pub fn ingest(&mut self, key: Option<ModeKey>, tick: u64) -> Option<ModeTransition> {
        let Some(key) = key else {
            return None;
        };

        match self.open {
            None => {
                self.open = Some(DwellWindow {
                    key,
                    start_tick: tick,
                });
                None
            }
            Some(window) if window.key == key => None,
            Some(window) => {
                let dwell_ms = tick.saturating_sub(window.start_tick) * self.tick_ms;
                self.close_window(window.key, dwell_ms);
                self.open = Some(DwellWindow {
                    key,
                    start_tick: tick,
                });
                Some(ModeTransition {
                    from: window.key,
                    to: Some(key),
                    dwell_ms,
                    closed_at_tick: tick,
                })
            }
        }
    }

    /// Closes any open window without opening a new one (shutdown path).
    pub fn flush(&mut self, tick: u64) -> Option<ModeTransition> {
        let window = self.open.take()?;
        let dwell_ms = tick.saturating_sub(window.start_tick) * self.tick_ms;
        self.close_window(window.key, dwell_ms);
        Some(ModeTransition {
            from: window.key,
            to: None,
            dwell_ms,
            closed_at_tick: tick,
        })
    }

    fn close_window(&mut self, key: ModeKey, dwell_ms: u64) {
        *self.cumulative_ms.entry(key.to_string()).or_insert(0) += dwell_ms;
        // Sub-tick dwells are artifacts of reclassification jitter.
        if dwell_ms < self.tick_ms {
            return;
        }
        self.profiles
            .entry(key.to_string())
            .or_default()
            .update(dwell_ms as f64, self.alpha);
    }

    pub fn current_mode(&self) -> Option<ModeKey> {
        self.open.map(|w| w.key)
    }

    pub fn current_dwell_ms(&self, tick: u64) -> u64 {
        self.open
            .map(|w| tick.saturating_sub(w.start_tick) * self.tick_ms)
            .unwrap_or(0)
    }

    pub fn cumulative_ms(&self, key: ModeKey) -> u64 {
        self.cumulative_ms
            .get(&key.to_string())
            .copied()
            .unwrap_or(0)
    }

    /// Warm profile for a mode, or `None` while cold.
    pub fn profile(&self, key: ModeKey) -> Option<&DurationProfile> {
        self.profiles
            .get(&key.to_string())
            .filter(|p| p.is_warm(self.n_min))
    }

    /// The profile regardless of warmth. Test and status surface.
    pub fn raw_profile(&self, key: ModeKey) -> Option<&DurationProfile> {
        self.profiles.get(&key.to_string())
    }

    pub fn samples(&self, key: ModeKey) -> u64 {
        self.raw_profile(key).map(|p| p.samples).unwrap_or(0)
    }

    /// Serializes all profiles as versioned JSON with stable key order.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct ProfileFile<'a> {
            schema: u32,
            profiles: &'a BTreeMap<String, DurationProfile>,
        }
        serde_json::to_string_pretty(&ProfileFile {
            schema: PROFILE_SCHEMA,
            profiles: &self.profiles,
        })
        .context("serializing duration profiles")
    }

    /// Atomic write of the profile map.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<()> {
        #[derive(Deserialize)]
        struct ProfileFile {
            schema: u32,
            profiles: BTreeMap<String, DurationProfile>,
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading profiles from {}", path.display()))?;
        let file: ProfileFile = serde_json::from_str(&content)
            .with_context(|| format!("parsing profiles from {}", path.display()))?;
        if file.schema != PROFILE_SCHEMA {
            bail!("unsupported profile schema {}", file.schema);
        }
        self.profiles = file.profiles;
        Ok(())
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Cumulative dwell per mode key, for the session summary.
    pub fn cumulative_totals(&self) -> BTreeMap<String, u64> {
        self.cumulative_ms.clone()
    }
}
