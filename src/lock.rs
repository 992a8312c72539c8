// ═══════════════════════════════════════════════════════════════════════════════
// lock.rs — Directory lock
// Governance Tier: LAW
// Invariant: SINGLE_HOLDER | FAIL_CLOSED
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Owner-tagged advisory lock bound to a directory. The lock file
//! (`ledger.lock`) is created with exclusive-create semantics — fail if it
//! already exists — so two processes racing to acquire never both succeed.
//!
//! ## State machine (per instance)
//!
//! ```text
//!  UNHELD ── acquire(agent, timeout) ──► HELD(agent)
//!  HELD(a) ── acquire(a, _)          ──► HELD(a)        (re-entrant)
//!  HELD(a) ── acquire(b≠a, _)        ──► LockMisuse      (fatal, same instance)
//!  HELD(a) ── release()              ──► UNHELD          (on-disk owner must match a)
//!  HELD(a) ── release(), owner≠a     ──► LockOwnershipMismatch
//!  UNHELD ── release()                ──► LockOwnershipMismatch (not held)
//! ```
//!
//! The instance's own `held`/`agent_id` bookkeeping is guarded by a mutex so a
//! single `DirectoryLock` is safe to share between threads of one process;
//! cross-process exclusion comes entirely from the exclusive-create lock file.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Name of the lock file within a ledger directory.
pub const LOCK_FILE_NAME: &str = "ledger.lock";

/// File mode for the lock file (`0600`).
pub const LOCK_FILE_MODE: u32 = 0o600;

/// Default interval between acquisition retries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// On-disk contents of `ledger.lock`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    pub agent_id: String,
    pub acquired_at: DateTime<Utc>,
}

struct HeldState {
    agent_id: String,
}

/// An owner-tagged advisory lock bound to a single ledger directory.
pub struct DirectoryLock {
    dir: PathBuf,
    poll_interval: Duration,
    held: Mutex<Option<HeldState>>,
}

impl DirectoryLock {
    /// Binds a new, initially-unheld lock instance to `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            held: Mutex::new(None),
        }
    }

    /// Overrides the default acquisition poll interval (used by tests that
    /// need tight timing bounds without the default 10 ms granularity).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE_NAME)
    }

    /// Acquires the lock, polling every `poll_interval` until `timeout`
    /// elapses.
    ///
    /// Re-entrant for the **same instance with the same agent id**. A
    /// different agent id on an already-held instance is a programming error
    /// and returns [`LedgerError::LockMisuse`] immediately — never a timeout.
    pub fn acquire(&self, agent_id: &str, timeout: Duration) -> LedgerResult<()> {
        if agent_id.is_empty() {
            return Err(LedgerError::invalid_argument("agent id must not be empty"));
        }
        if !self.dir.is_dir() {
            return Err(LedgerError::NotFound {
                what: "ledger directory",
                path: self.dir.clone(),
            });
        }

        {
            let guard = self.held.lock().unwrap();
            if let Some(state) = guard.as_ref() {
                if state.agent_id == agent_id {
                    return Ok(());
                }
                return Err(LedgerError::LockMisuse {
                    held_by: state.agent_id.clone(),
                    requested_by: agent_id.to_string(),
                });
            }
        }

        let start = Instant::now();
        let lock_path = self.lock_path();
        let mut retries = 0u32;
        loop {
            match self.try_create(&lock_path, agent_id) {
                Ok(()) => {
                    let mut guard = self.held.lock().unwrap();
                    *guard = Some(HeldState {
                        agent_id: agent_id.to_string(),
                    });
                    tracing::info!(
                        agent = agent_id,
                        dir = %self.dir.display(),
                        retries,
                        waited_ms = start.elapsed().as_millis() as u64,
                        "ledger lock acquired"
                    );
                    return Ok(());
                }
                Err(LedgerError::Io { ref source, .. })
                    if source.kind() == std::io::ErrorKind::AlreadyExists =>
                {
                    if start.elapsed() >= timeout {
                        tracing::warn!(
                            agent = agent_id,
                            dir = %self.dir.display(),
                            retries,
                            waited_ms = start.elapsed().as_millis() as u64,
                            "ledger lock acquisition timed out"
                        );
                        return Err(LedgerError::LockTimeout {
                            agent: agent_id.to_string(),
                            dir: self.dir.clone(),
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    retries += 1;
                    tracing::debug!(
                        agent = agent_id,
                        dir = %self.dir.display(),
                        retries,
                        "ledger lock held by another agent, retrying"
                    );
                    std::thread::sleep(self.poll_interval);
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn try_create(&self, lock_path: &Path, agent_id: &str) -> LedgerResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
            .map_err(|source| LedgerError::io("create lock file", lock_path, source))?;

        let record = LockRecord {
            agent_id: agent_id.to_string(),
            acquired_at: Utc::now(),
        };
        let write_result = serde_json::to_vec(&record)
            .map_err(LedgerError::Serialization)
            .and_then(|bytes| {
                file.write_all(&bytes)
                    .map_err(|source| LedgerError::io("write lock file", lock_path, source))
            })
            .and_then(|()| set_mode(lock_path, LOCK_FILE_MODE));

        if let Err(err) = write_result {
            // Best-effort cleanup: a failed write must not leave a lock file
            // nobody believes they hold.
            let _ = std::fs::remove_file(lock_path);
            return Err(err);
        }
        Ok(())
    }

    /// Releases the lock. Requires the on-disk record's `agent_id` to match
    /// the agent this instance acquired with. If the record is already gone
    /// (the unlink from a prior, partially-observed release raced us) this is
    /// treated as already-released and succeeds.
    pub fn release(&self, agent_id: &str) -> LedgerResult<()> {
        let mut guard = self.held.lock().unwrap();
        let held_agent = match guard.as_ref() {
            Some(state) => state.agent_id.clone(),
            None => {
                return Err(LedgerError::LockOwnershipMismatch {
                    expected: agent_id.to_string(),
                    found: "<unheld>".to_string(),
                })
            }
        };
        if held_agent != agent_id {
            return Err(LedgerError::LockOwnershipMismatch {
                expected: agent_id.to_string(),
                found: held_agent,
            });
        }

        let lock_path = self.lock_path();
        match read_record(&lock_path) {
            Ok(record) => {
                if record.agent_id != held_agent {
                    return Err(LedgerError::LockOwnershipMismatch {
                        expected: held_agent,
                        found: record.agent_id,
                    });
                }
                std::fs::remove_file(&lock_path)
                    .map_err(|source| LedgerError::io("remove lock file", &lock_path, source))?;
            }
            Err(LedgerError::NotFound { .. }) => {
                // Already removed by a racing release; treat as success.
            }
            Err(other) => return Err(other),
        }

        *guard = None;
        Ok(())
    }

    /// Reads the current holder's record without acquiring the lock.
    pub fn holder(&self) -> LedgerResult<LockRecord> {
        read_record(&self.lock_path())
    }
}

fn read_record(lock_path: &Path) -> LedgerResult<LockRecord> {
    let mut contents = String::new();
    let mut file = std::fs::File::open(lock_path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LedgerError::NotFound {
                what: "lock file",
                path: lock_path.to_path_buf(),
            }
        } else {
            LedgerError::io("open lock file", lock_path, source)
        }
    })?;
    file.read_to_string(&mut contents)
        .map_err(|source| LedgerError::io("read lock file", lock_path, source))?;
    serde_json::from_str(&contents).map_err(LedgerError::Serialization)
}

/// Logs a release failure rather than letting it disappear silently. This is
/// the only place the core touches process logging (see `SPEC_FULL.md` §4.D).
pub fn release_lock(lock: &DirectoryLock, agent_id: &str, op_name: &str) {
    if let Err(err) = lock.release(agent_id) {
        tracing::error!(op = op_name, agent = agent_id, error = %err, "failed to release ledger lock");
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> LedgerResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|source| LedgerError::io("chmod lock file", path, source))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> LedgerResult<()> {
    Ok(())
}
