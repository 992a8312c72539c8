//! Directory-spanning scenarios exercising the full write protocol across
//! modules: appender, scanner, filename codec, and lock together. These
//! mirror the literal end-to-end walkthroughs a reviewer would check by
//! hand against a ledger directory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ledger_core::lock::DirectoryLock;
use ledger_core::{Event, Ledger, LedgerError};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct RecordedEvent {
    #[serde(rename = "type")]
    kind: String,
    payload: String,
}

impl Event for RecordedEvent {
    fn event_type(&self) -> &str {
        &self.kind
    }
}

fn event(payload: &str) -> RecordedEvent {
    RecordedEvent {
        kind: "RECORDED".to_string(),
        payload: payload.to_string(),
    }
}

#[test]
fn scenario_first_append_creates_seq_one() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::open(dir.path(), "writer").unwrap();

    let seq = ledger.append(&event("e1")).unwrap();

    assert_eq!(seq, 1);
    assert_eq!(ledger.count().unwrap(), 1);
    let path = dir.path().join("000001.json");
    assert!(path.exists());
    let on_disk: RecordedEvent = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(on_disk, event("e1"));
}

#[test]
fn scenario_second_append_has_no_gaps() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::open(dir.path(), "writer").unwrap();

    ledger.append(&event("e1")).unwrap();
    let seq = ledger.append(&event("e2")).unwrap();

    assert_eq!(seq, 2);
    assert!(!ledger.has_gaps().unwrap());
}

#[test]
fn scenario_batch_continues_after_manually_staged_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("000001.json"), b"{\"type\":\"SEEDED\"}").unwrap();
    std::fs::write(dir.path().join("000002.json"), b"{\"type\":\"SEEDED\"}").unwrap();

    let ledger = Ledger::open(dir.path(), "writer").unwrap();
    let seqs = ledger
        .append_batch(&[event("a"), event("b"), event("c")])
        .unwrap();

    assert_eq!(seqs, vec![3, 4, 5]);
    for n in 1..=5 {
        assert!(dir.path().join(format!("{n:06}.json")).exists());
    }
}

#[test]
fn scenario_cross_instance_lock_timeout() {
    let dir = tempdir().unwrap();
    let holder = DirectoryLock::new(dir.path());
    holder.acquire("alpha", Duration::from_secs(5)).unwrap();

    let contender = DirectoryLock::new(dir.path()).with_poll_interval(Duration::from_millis(5));
    let start = Instant::now();
    let result = contender.acquire("beta", Duration::from_millis(200));
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(LedgerError::LockTimeout { .. })));
    assert!(elapsed >= Duration::from_millis(180));
    assert!(elapsed <= Duration::from_millis(500));

    holder.release("alpha").unwrap();
}

#[test]
fn scenario_exactly_one_cas_wins_under_contention() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::open(dir.path(), "seed").unwrap();
    ledger.append(&event("e1")).unwrap();

    let path: std::path::PathBuf = dir.path().to_path_buf();
    let path = Arc::new(path);
    let barrier = Arc::new(std::sync::Barrier::new(10));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let ledger = Ledger::open(path.as_path(), format!("racer-{i}")).unwrap();
                barrier.wait();
                ledger.append_if_sequence(&event("contender"), 1)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    let mismatches: Vec<_> = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_sequence_mismatch()))
        .collect();

    assert_eq!(successes.len(), 1);
    assert_eq!(mismatches.len(), 9);
    assert_eq!(*successes[0].as_ref().unwrap(), 2);
    assert_eq!(ledger.count().unwrap(), 2);
}

#[test]
fn scenario_foreign_owner_overwrite_is_ownership_mismatch_on_release() {
    let dir = tempdir().unwrap();
    let lock = DirectoryLock::new(dir.path());
    lock.acquire("alpha", Duration::from_secs(5)).unwrap();

    let foreign_record = serde_json::json!({
        "agent_id": "mallory",
        "acquired_at": "2026-07-28T00:00:00Z",
    });
    std::fs::write(
        dir.path().join("ledger.lock"),
        serde_json::to_vec(&foreign_record).unwrap(),
    )
    .unwrap();

    let result = lock.release("alpha");
    assert!(matches!(result, Err(LedgerError::LockOwnershipMismatch { .. })));
}
