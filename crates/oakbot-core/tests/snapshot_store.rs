use chrono::Utc;
use oakbot_core::snapshot::{decode, encode, SnapshotError, SnapshotReason, SnapshotStore};

const HASH: [u8; 32] = [7u8; 32];

#[test]
fn encode_decode_round_trips() {
    let payload = b"opaque emulator state".to_vec();
    let bytes = encode(42, SnapshotReason::Milestone, &HASH, &payload);
    // 64-byte header + payload + 4-byte CRC trailer.
    assert_eq!(bytes.len(), 64 + payload.len() + 4);

    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.tick_id, 42);
    assert_eq!(decoded.reason, SnapshotReason::Milestone);
    assert_eq!(decoded.agent_hash, HASH);
    assert_eq!(decoded.payload, payload);
}

#[test]
fn corruption_is_detected_by_the_crc() {
    let mut bytes = encode(1, SnapshotReason::Periodic, &HASH, b"payload");
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    assert!(matches!(decode(&bytes), Err(SnapshotError::CrcMismatch)));
}

#[test]
fn truncated_files_are_rejected() {
    assert!(matches!(
        decode(&[0u8; 10]),
        Err(SnapshotError::TooShort(10))
    ));
}

#[test]
fn ring_rotates_and_deletes_evicted_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SnapshotStore::new(dir.path(), 3);

    for tick in 1..=5u64 {
        store
            .write(tick, SnapshotReason::Periodic, None, &HASH, b"state")
            .unwrap();
    }
    assert_eq!(store.ring_len(), 3);
    // The first two files were evicted and removed.
    assert!(!dir.path().join("snap-1-periodic.bin").exists());
    assert!(!dir.path().join("snap-2-periodic.bin").exists());
    assert!(dir.path().join("snap-5-periodic.bin").exists());
}

#[test]
fn named_snapshots_survive_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SnapshotStore::new(dir.path(), 2);

    store
        .write(1, SnapshotReason::BootComplete, Some("boot-complete"), &HASH, b"boot")
        .unwrap();
    for tick in 2..=10u64 {
        store
            .write(tick, SnapshotReason::Periodic, None, &HASH, b"state")
            .unwrap();
    }
    let named = store.find_named("boot-complete").unwrap();
    assert!(named.file.exists());
    let decoded = store.load(named).unwrap();
    assert_eq!(decoded.payload, b"boot");
}

#[test]
fn duplicate_tick_and_reason_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SnapshotStore::new(dir.path(), 4);
    store
        .write(7, SnapshotReason::Periodic, None, &HASH, b"a")
        .unwrap();
    let err = store
        .write(7, SnapshotReason::Periodic, None, &HASH, b"b")
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Duplicate { tick: 7, .. }));

    // Same tick under a different reason is fine.
    store
        .write(7, SnapshotReason::Milestone, None, &HASH, b"c")
        .unwrap();
}

#[test]
fn recovery_never_restores_the_current_tick() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SnapshotStore::new(dir.path(), 4);
    store
        .write(100, SnapshotReason::Periodic, None, &HASH, b"old")
        .unwrap();
    store
        .write(200, SnapshotReason::PreRecovery, None, &HASH, b"current")
        .unwrap();

    let target = store
        .latest_restorable(200, Utc::now(), 120_000)
        .expect("older snapshot available");
    assert_eq!(target.tick_id, 100);

    assert!(store.latest_restorable(100, Utc::now(), 120_000).is_none());
    assert_eq!(store.latest().unwrap().tick_id, 200);
}
