use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::MemoryError;

/// Beta(1, 1) prior for pattern confidence.
const PRIOR_ALPHA: f32 = 1.0;
const PRIOR_BETA: f32 = 1.0;

const PRUNE_CONFIDENCE: f32 = 0.2;
const PRUNE_MIN_EVIDENCE: u32 = 5;

/// 128-bit content address over arbitrary trigger features.
pub fn signature_of(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
    out
}

/// A persistent trigger/response pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticianPattern {
    pub signature: [u8; 16],
    pub response: String,
    pub evidence_count: u32,
    pub successes: u32,
    /// Bayesian posterior mean, decayed over idle time.
    pub confidence: f32,
    pub last_used_tick: u64,
}

impl TacticianPattern {
    fn posterior(successes: u32, evidence: u32) -> f32 {
        (PRIOR_ALPHA + successes as f32) / (PRIOR_ALPHA + PRIOR_BETA + evidence as f32)
    }
}

/// Persistent pattern tier backed by an append-mostly JSONL log.
///
/// Inserts are idempotent per signature: repeated evidence updates the
/// existing pattern instead of duplicating it.
#[derive(Debug)]
pub struct TacticianMemory {
    patterns: HashMap<[u8; 16], TacticianPattern>,
    log_path: Option<PathBuf>,
    appends_since_compact: usize,
    compact_every: usize,
}

impl Default for TacticianMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl TacticianMemory {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            log_path: None,
            appends_since_compact: 0,
            compact_every: 1024,
        }
    }

    /// Opens (or creates) the backing log. Later lines for the same
    /// signature supersede earlier ones.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MemoryError> {
        let path = path.into();
        let mut mem = Self::new();
        if path.exists() {
            let reader = BufReader::new(fs::File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let pattern: TacticianPattern = serde_json::from_str(&line)?;
                mem.patterns.insert(pattern.signature, pattern);
            }
        }
        mem.log_path = Some(path);
        Ok(mem)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, signature: &[u8; 16]) -> Option<&TacticianPattern> {
        self.patterns.get(signature)
    }

    /// Looks a pattern up for use, stamping `last_used_tick`.
    pub fn consult(&mut self, signature: &[u8; 16], tick: u64) -> Option<&TacticianPattern> {
        let pattern = self.patterns.get_mut(signature)?;
        pattern.last_used_tick = tick;
        Some(pattern)
    }

    /// Records one piece of evidence for a trigger/response pair.
    pub fn observe(
        &mut self,
        signature: [u8; 16],
        response: &str,
        success: bool,
        tick: u64,
    ) -> Result<&TacticianPattern, MemoryError> {
        let pattern = self
            .patterns
            .entry(signature)
            .or_insert_with(|| TacticianPattern {
                signature,
                response: response.to_string(),
                evidence_count: 0,
                successes: 0,
                confidence: TacticianPattern::posterior(0, 0),
                last_used_tick: tick,
            });
        pattern.evidence_count += 1;
        if success {
            pattern.successes += 1;
        }
        pattern.confidence =
            TacticianPattern::posterior(pattern.successes, pattern.evidence_count);
        pattern.last_used_tick = tick;

        let line = serde_json::to_string(&*pattern)?;
        self.append_line(&line)?;
        Ok(&self.patterns[&signature])
    }

    fn append_line(&mut self, line: &str) -> Result<(), MemoryError> {
        let Some(path) = self.log_path.clone() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{line}")?;
        self.appends_since_compact += 1;
        if self.appends_since_compact >= self.compact_every {
            self.compact()?;
        }
        Ok(())
    }

    /// Rewrites the log with one line per live pattern.
    pub fn compact(&mut self) -> Result<(), MemoryError> {
        let Some(path) = self.log_path.clone() else {
            return Ok(());
        };
        let mut lines = Vec::with_capacity(self.patterns.len());
        for pattern in self.patterns.values() {
            lines.push(serde_json::to_string(pattern)?);
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, lines.join("\n") + "\n")?;
        fs::rename(&tmp, &path)?;
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Applies exponential forgetting for the window `(since_tick, now_tick]`.
    ///
    /// Each pattern decays only over the part of the window it sat unused,
    /// so repeated passes never double-count idle time. `lambda` is per
    /// tick; a half-life of ~10^6 ticks corresponds to `lambda = ln(2) / 1e6`.
    pub fn decay(&mut self, now_tick: u64, since_tick: u64, lambda: f64) {
        for pattern in self.patterns.values_mut() {
            let idle_from = pattern.last_used_tick.max(since_tick);
            let idle = now_tick.saturating_sub(idle_from) as f64;
            if idle <= 0.0 {
                continue;
            }
            pattern.confidence = (pattern.confidence as f64 * (-lambda * idle).exp()) as f32;
        }
    }

    /// Drops patterns whose confidence fell below the floor after enough
    /// evidence accumulated to trust the estimate.
    pub fn prune(&mut self) -> usize {
        let before = self.patterns.len();
        self.patterns.retain(|_, p| {
            p.evidence_count < PRUNE_MIN_EVIDENCE || p.confidence >= PRUNE_CONFIDENCE
        });
        before - self.patterns.len()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &TacticianPattern> {
        self.patterns.values()
    }
}
