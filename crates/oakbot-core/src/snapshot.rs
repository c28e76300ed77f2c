//! On-disk snapshot ring with named milestones.
//!
//! File layout: a fixed 64-byte header (magic, version, reason, tick id,
//! agent hash, payload length), the opaque emulator blob, then a CRC32
//! trailer over everything before it. Writes go through a temp file and
//! rename.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

const MAGIC: &[u8; 8] = b"OAKSNAP\0";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot too short ({0} bytes)")]
    TooShort(usize),
    #[error("bad snapshot magic")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    BadVersion(u32),
    #[error("snapshot crc mismatch")]
    CrcMismatch,
    #[error("snapshot for tick {tick} reason {reason:?} already exists")]
    Duplicate { tick: u64, reason: SnapshotReason },
    #[error("no snapshot available")]
    NoneAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotReason {
    BootComplete,
    Milestone,
    PreRecovery,
    Periodic,
    GracefulStop,
}

impl SnapshotReason {
    pub fn code(self) -> u8 {
        match self {
            SnapshotReason::BootComplete => 1,
            SnapshotReason::Milestone => 2,
            SnapshotReason::PreRecovery => 3,
            SnapshotReason::Periodic => 4,
            SnapshotReason::GracefulStop => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(SnapshotReason::BootComplete),
            2 => Some(SnapshotReason::Milestone),
            3 => Some(SnapshotReason::PreRecovery),
            4 => Some(SnapshotReason::Periodic),
            5 => Some(SnapshotReason::GracefulStop),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SnapshotReason::BootComplete => "boot-complete",
            SnapshotReason::Milestone => "milestone",
            SnapshotReason::PreRecovery => "pre-recovery",
            SnapshotReason::Periodic => "periodic",
            SnapshotReason::GracefulStop => "graceful-stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub tick_id: u64,
    pub reason: SnapshotReason,
    /// Named snapshots live outside the rotation ring.
    pub name: Option<String>,
    pub file: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Encodes header + payload + CRC trailer.
pub fn encode(tick_id: u64, reason: SnapshotReason, agent_hash: &[u8; 32], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.push(reason.code());
    bytes.extend_from_slice(&[0u8; 3]);
    bytes.extend_from_slice(&tick_id.to_le_bytes());
    bytes.extend_from_slice(agent_hash);
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    debug_assert_eq!(bytes.len(), HEADER_LEN);
    bytes.extend_from_slice(payload);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bytes);
    bytes.extend_from_slice(&hasher.finalize().to_le_bytes());
    bytes
}

/// Decoded snapshot: header fields plus the emulator payload.
#[derive(Debug, Clone)]
pub struct DecodedSnapshot {
    pub tick_id: u64,
    pub reason: SnapshotReason,
    pub agent_hash: [u8; 32],
    pub payload: Vec<u8>,
}

pub fn decode(bytes: &[u8]) -> Result<DecodedSnapshot, SnapshotError> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err(SnapshotError::TooShort(bytes.len()));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if hasher.finalize() != expected {
        return Err(SnapshotError::CrcMismatch);
    }

    if &body[..8] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let version = u32::from_le_bytes([body[8], body[9], body[10], body[11]]);
    if version != VERSION {
        return Err(SnapshotError::BadVersion(version));
    }
    let reason = SnapshotReason::from_code(body[12]).ok_or(SnapshotError::BadMagic)?;
    let mut tick_bytes = [0u8; 8];
    tick_bytes.copy_from_slice(&body[16..24]);
    let tick_id = u64::from_le_bytes(tick_bytes);
    let mut agent_hash = [0u8; 32];
    agent_hash.copy_from_slice(&body[24..56]);

    Ok(DecodedSnapshot {
        tick_id,
        reason,
        agent_hash,
        payload: body[HEADER_LEN..].to_vec(),
    })
}

/// Rotating ring of snapshots plus preserved named milestones.
pub struct SnapshotStore {
    dir: PathBuf,
    ring_size: usize,
    ring: VecDeque<SnapshotMeta>,
    named: Vec<SnapshotMeta>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, ring_size: usize) -> Self {
        Self {
            dir: dir.into(),
            ring_size: ring_size.max(1),
            ring: VecDeque::new(),
            named: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ring_len(&self) -> usize {
        self.ring.len()
    }

    pub fn named(&self) -> &[SnapshotMeta] {
        &self.named
    }

    fn file_for(&self, tick_id: u64, reason: SnapshotReason) -> PathBuf {
        self.dir
            .join(format!("snap-{}-{}.bin", tick_id, reason.label()))
    }

    fn exists(&self, tick_id: u64, reason: SnapshotReason) -> bool {
        self.ring
            .iter()
            .chain(self.named.iter())
            .any(|m| m.tick_id == tick_id && m.reason == reason)
    }

    /// Writes a snapshot synchronously and registers it. No two snapshots
    /// may share a (tick, reason) pair.
    pub fn write(
        &mut self,
        tick_id: u64,
        reason: SnapshotReason,
        name: Option<&str>,
        agent_hash: &[u8; 32],
        payload: &[u8],
    ) -> Result<SnapshotMeta, SnapshotError> {
        if self.exists(tick_id, reason) {
            return Err(SnapshotError::Duplicate {
                tick: tick_id,
                reason,
            });
        }
        fs::create_dir_all(&self.dir)?;
        let file = self.file_for(tick_id, reason);
        let bytes = encode(tick_id, reason, agent_hash, payload);
        write_atomic(&file, &bytes)?;

        let meta = SnapshotMeta {
            tick_id,
            reason,
            name: name.map(String::from),
            file,
            created_at: Utc::now(),
        };
        self.register(meta.clone());
        Ok(meta)
    }

    /// Registers an already-written snapshot, rotating the ring.
    pub fn register(&mut self, meta: SnapshotMeta) {
        if meta.name.is_some() {
            self.named.push(meta);
            return;
        }
        self.ring.push_back(meta);
        while self.ring.len() > self.ring_size {
            if let Some(evicted) = self.ring.pop_front() {
                let _ = fs::remove_file(&evicted.file);
            }
        }
    }

    /// Loads and verifies a snapshot file. Synchronous; blocks the caller.
    pub fn load(&self, meta: &SnapshotMeta) -> Result<DecodedSnapshot, SnapshotError> {
        let bytes = fs::read(&meta.file)?;
        decode(&bytes)
    }

    pub fn latest(&self) -> Option<&SnapshotMeta> {
        let ring_latest = self.ring.back();
        let named_latest = self.named.iter().max_by_key(|m| m.tick_id);
        match (ring_latest, named_latest) {
            (Some(r), Some(n)) => Some(if r.tick_id >= n.tick_id { r } else { n }),
            (Some(r), None) => Some(r),
            (None, Some(n)) => Some(n),
            (None, None) => None,
        }
    }

    /// Latest snapshot no older than `max_age_ms` against `now`.
    pub fn latest_within(&self, now: DateTime<Utc>, max_age_ms: u64) -> Option<&SnapshotMeta> {
        self.latest_restorable(u64::MAX, now, max_age_ms)
    }

    /// Latest snapshot strictly before `before_tick` and no older than
    /// `max_age_ms`. Recovery uses this so it never restores the state it
    /// is trying to escape.
    pub fn latest_restorable(
        &self,
        before_tick: u64,
        now: DateTime<Utc>,
        max_age_ms: u64,
    ) -> Option<&SnapshotMeta> {
        self.ring
            .iter()
            .chain(self.named.iter())
            .filter(|m| m.tick_id < before_tick)
            .filter(|m| {
                now.signed_duration_since(m.created_at)
                    .num_milliseconds()
                    .unsigned_abs()
                    <= max_age_ms
            })
            .max_by_key(|m| m.tick_id)
    }

    pub fn find_named(&self, name: &str) -> Option<&SnapshotMeta> {
        self.named
            .iter()
            .rev()
            .find(|m| m.name.as_deref() == Some(name))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
