// ═══════════════════════════════════════════════════════════════════════════════
// ledger.rs — Facade
// Governance Tier: LAW
// Invariant: ATOMIC_WRITE | MUTEX_LOCK | FAIL_CLOSED
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! # Ledger Facade
//!
//! `Ledger` is an ergonomic wrapper around the free functions in
//! [`crate::appender`] and [`crate::reader`]: a handle bound to a validated
//! directory and an agent id, dispatching to the same stateless operations.
//! It is a style choice, not a semantic requirement — all behavior is also
//! reachable as free functions taking the directory path directly, and
//! multiple `Ledger` handles on the same directory (from one process or
//! many) are permitted and coherent, since all state lives on disk.
//!
//! ## Write protocol (every mutating call)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. VALIDATE the ledger directory exists                    │
//! │  2. ACQUIRE the exclusive directory lock (timeout-bounded)  │
//! │  3. COMPUTE the next sequence number(s)                     │
//! │  4. STAGE event bytes under a temp file, fsync, chmod       │
//! │  5. RENAME temp → final (atomic on POSIX)                   │
//! │  6. RELEASE the lock                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::appender;
use crate::config::{LedgerConfig, DEFAULT_LOCK_TIMEOUT};
use crate::error::{LedgerError, LedgerResult};
use crate::event::Event;
use crate::lock::{DirectoryLock, LockRecord};
use crate::reader::{self, ScanFlow};
use crate::scanner;

/// A directory-bound handle aggregating append and read operations into a
/// stateful API object.
///
/// Construction fails if `dir` does not exist or is not a directory —
/// mirroring the free-function validation every operation performs anyway,
/// just paid once at construction instead of on every call.
#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
    agent_id: String,
    config: LedgerConfig,
}

impl Ledger {
    /// Opens a ledger bound to `dir`, identifying this handle's writes with
    /// `agent_id` for lock ownership purposes.
    pub fn open(dir: impl Into<PathBuf>, agent_id: impl Into<String>) -> LedgerResult<Self> {
        Self::open_with_config(dir, agent_id, LedgerConfig::default())
    }

    /// Like [`Ledger::open`], overriding the default lock timeout / write
    /// configuration.
    pub fn open_with_config(
        dir: impl Into<PathBuf>,
        agent_id: impl Into<String>,
        config: LedgerConfig,
    ) -> LedgerResult<Self> {
        let dir = dir.into();
        let agent_id = agent_id.into();
        if agent_id.is_empty() {
            return Err(LedgerError::invalid_argument("agent id must not be empty"));
        }
        let meta = std::fs::metadata(&dir).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LedgerError::NotFound {
                    what: "ledger directory",
                    path: dir.clone(),
                }
            } else {
                LedgerError::io("stat", &dir, source)
            }
        })?;
        if !meta.is_dir() {
            return Err(LedgerError::NotADirectory(dir));
        }
        Ok(Self {
            dir,
            agent_id,
            config,
        })
    }

    /// The directory this handle is bound to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appends `event`, using this handle's full configured knobs (lock
    /// timeout, poll interval, atomic-write durability).
    pub fn append<E: Event>(&self, event: &E) -> LedgerResult<u64> {
        appender::append_with_config(&self.dir, &self.agent_id, event, &self.config)
    }

    /// Appends `event`, waiting up to `timeout` for the lock; other knobs
    /// (poll interval, atomic-write durability) still come from this
    /// handle's configured `LedgerConfig`.
    pub fn append_with_timeout<E: Event>(&self, event: &E, timeout: Duration) -> LedgerResult<u64> {
        appender::append_with_config(
            &self.dir,
            &self.agent_id,
            event,
            &LedgerConfig {
                lock_timeout: timeout,
                ..self.config
            },
        )
    }

    /// Compare-and-swap append: see [`appender::append_if_sequence`].
    pub fn append_if_sequence<E: Event>(&self, event: &E, expected_seq: u64) -> LedgerResult<u64> {
        appender::append_if_sequence_with_config(
            &self.dir,
            &self.agent_id,
            event,
            expected_seq,
            &self.config,
        )
    }

    /// Batch append: see [`appender::append_batch`].
    pub fn append_batch<E: Event>(&self, events: &[E]) -> LedgerResult<Vec<u64>> {
        appender::append_batch_with_config(&self.dir, &self.agent_id, events, &self.config)
    }

    /// Reads every event in ascending sequence order.
    pub fn read_all(&self) -> LedgerResult<Vec<Vec<u8>>> {
        reader::read_all(&self.dir)
    }

    /// Reads a single event by sequence number.
    pub fn read_event(&self, seq: u64) -> LedgerResult<Vec<u8>> {
        reader::read_event(&self.dir, seq)
    }

    /// Streaming scan; see [`reader::scan`].
    pub fn scan<F>(&self, callback: F) -> LedgerResult<()>
    where
        F: FnMut(u64, &[u8]) -> LedgerResult<ScanFlow>,
    {
        reader::scan(&self.dir, callback)
    }

    /// Number of valid event files currently in the ledger.
    pub fn count(&self) -> LedgerResult<usize> {
        scanner::count(&self.dir)
    }

    /// `true` iff the ledger's sequence numbers are not a contiguous
    /// `1..=n` run.
    pub fn has_gaps(&self) -> LedgerResult<bool> {
        scanner::has_gaps(&self.dir)
    }

    /// Ascending `{seq, path}` entries for every event file.
    pub fn list_event_files(&self) -> LedgerResult<Vec<scanner::EventFileEntry>> {
        scanner::list_event_files(&self.dir)
    }

    /// Reads the current lock holder's record, if the ledger is currently
    /// locked by any handle (including this one).
    pub fn lock_holder(&self) -> LedgerResult<LockRecord> {
        DirectoryLock::new(&self.dir).holder()
    }
}

/// Default lock-acquisition deadline used by `Ledger::append` and friends
/// when no explicit timeout is supplied. Re-exported for callers that want
/// to match it when calling the `_with_timeout` free functions directly.
pub const DEFAULT_APPEND_TIMEOUT: Duration = DEFAULT_LOCK_TIMEOUT;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestEvent {
        #[serde(rename = "type")]
        kind: String,
        timestamp: String,
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &str {
            &self.kind
        }
    }

    fn event() -> TestEvent {
        TestEvent {
            kind: "TEST_EVENT".to_string(),
            timestamp: "2026-07-28T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn open_fails_on_missing_directory() {
        let result = Ledger::open("/nonexistent/path/for/ledger/facade/test", "writer");
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn open_fails_on_empty_agent_id() {
        let dir = tempdir().unwrap();
        let result = Ledger::open(dir.path(), "");
        assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));
    }

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path(), "writer").unwrap();
        let seq = ledger.append(&event()).unwrap();
        assert_eq!(seq, 1);
        assert_eq!(ledger.count().unwrap(), 1);
        assert!(!ledger.has_gaps().unwrap());

        let all = ledger.read_all().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn multiple_handles_on_same_directory_are_coherent() {
        let dir = tempdir().unwrap();
        let writer_a = Ledger::open(dir.path(), "writer-a").unwrap();
        let writer_b = Ledger::open(dir.path(), "writer-b").unwrap();

        writer_a.append(&event()).unwrap();
        writer_b.append(&event()).unwrap();

        assert_eq!(writer_a.count().unwrap(), 2);
        assert_eq!(writer_b.count().unwrap(), 2);
    }

    #[test]
    fn cas_via_facade() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path(), "writer").unwrap();
        let seq = ledger.append_if_sequence(&event(), 0).unwrap();
        assert_eq!(seq, 1);
        let err = ledger.append_if_sequence(&event(), 0).unwrap_err();
        assert!(err.is_sequence_mismatch());
    }

    #[test]
    fn open_with_config_honors_lock_timeout_and_poll_interval_on_append() {
        let dir = tempdir().unwrap();
        let holder = DirectoryLock::new(dir.path());
        holder.acquire("holder", Duration::from_secs(5)).unwrap();

        let ledger = Ledger::open_with_config(
            dir.path(),
            "contender",
            LedgerConfig {
                lock_timeout: Duration::from_millis(150),
                lock_poll_interval: Duration::from_millis(5),
                ..LedgerConfig::default()
            },
        )
        .unwrap();

        let start = std::time::Instant::now();
        let err = ledger.append(&event()).unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, LedgerError::LockTimeout { .. }));
        assert!(elapsed < Duration::from_secs(1));
        holder.release("holder").unwrap();
    }
}
