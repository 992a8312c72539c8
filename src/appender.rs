// ═══════════════════════════════════════════════════════════════════════════════
// appender.rs — Appender
// Governance Tier: LAW
// Invariant: ATOMIC_WRITE | SEQUENCE_MONOTONICITY | CAS_LINEARIZABLE
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! `Append`, `AppendWithTimeout`, `AppendIfSequence`, `AppendIfSequenceWithTimeout`,
//! and `AppendBatch` — the write side of the ledger. Every entry point shares
//! the same skeleton: validate the directory, acquire the lock, compute the
//! sequence(s), serialize, atomic-write, release, return.
//!
//! `AppendBatch` is the one operation whose documented behavior is
//! deliberately imperfect: see its doc comment and `SPEC_FULL.md` §9.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::atomic::{self, AtomicWriteConfig};
use crate::config::{LedgerConfig, DEFAULT_LOCK_TIMEOUT};
use crate::error::{LedgerError, LedgerResult};
use crate::event::Event;
use crate::filename;
use crate::lock::{self, DirectoryLock};
use crate::scanner;

fn validate_dir(dir: &Path) -> LedgerResult<()> {
    let meta = std::fs::metadata(dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LedgerError::NotFound {
                what: "ledger directory",
                path: dir.to_path_buf(),
            }
        } else {
            LedgerError::io("stat", dir, source)
        }
    })?;
    if !meta.is_dir() {
        return Err(LedgerError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Appends `event` to the ledger at `dir`, using the default lock timeout.
/// Returns the assigned sequence number.
pub fn append<E: Event>(dir: &Path, agent_id: &str, event: &E) -> LedgerResult<u64> {
    append_with_timeout(dir, agent_id, event, DEFAULT_LOCK_TIMEOUT)
}

/// Appends `event` to the ledger at `dir`, waiting up to `timeout` to acquire
/// the directory lock.
pub fn append_with_timeout<E: Event>(
    dir: &Path,
    agent_id: &str,
    event: &E,
    timeout: Duration,
) -> LedgerResult<u64> {
    append_with_config(
        dir,
        agent_id,
        event,
        &LedgerConfig {
            lock_timeout: timeout,
            ..LedgerConfig::default()
        },
    )
}

/// Full-config form of [`append_with_timeout`], also honoring `config`'s lock
/// poll interval and atomic-write durability knobs. This is what [`crate::ledger::Ledger`]
/// calls so a handle opened with [`crate::ledger::Ledger::open_with_config`]
/// actually observes every knob it was given, not just the lock timeout.
pub fn append_with_config<E: Event>(
    dir: &Path,
    agent_id: &str,
    event: &E,
    config: &LedgerConfig,
) -> LedgerResult<u64> {
    validate_dir(dir)?;
    let directory_lock = DirectoryLock::new(dir).with_poll_interval(config.lock_poll_interval);
    directory_lock.acquire(agent_id, config.lock_timeout)?;
    let result = (|| {
        let seq = scanner::next_sequence(dir)?;
        let bytes_written = write_one(dir, seq, event, config.write)?;
        tracing::info!(
            agent = agent_id,
            dir = %dir.display(),
            seq,
            bytes = bytes_written,
            "ledger append committed"
        );
        Ok(seq)
    })();
    lock::release_lock(&directory_lock, agent_id, "append");
    result
}

/// Appends `event` only if the directory currently contains exactly events
/// `1..=expected_seq` (compare-and-swap on sequence). `expected_seq = 0`
/// means "expect an empty ledger". On mismatch the event is **not** written
/// and [`LedgerError::SequenceMismatch`] is returned.
pub fn append_if_sequence<E: Event>(
    dir: &Path,
    agent_id: &str,
    event: &E,
    expected_seq: u64,
) -> LedgerResult<u64> {
    append_if_sequence_with_timeout(dir, agent_id, event, expected_seq, DEFAULT_LOCK_TIMEOUT)
}

/// Timed form of [`append_if_sequence`].
pub fn append_if_sequence_with_timeout<E: Event>(
    dir: &Path,
    agent_id: &str,
    event: &E,
    expected_seq: u64,
    timeout: Duration,
) -> LedgerResult<u64> {
    append_if_sequence_with_config(
        dir,
        agent_id,
        event,
        expected_seq,
        &LedgerConfig {
            lock_timeout: timeout,
            ..LedgerConfig::default()
        },
    )
}

/// Full-config form of [`append_if_sequence_with_timeout`]; see
/// [`append_with_config`] for why this variant exists.
pub fn append_if_sequence_with_config<E: Event>(
    dir: &Path,
    agent_id: &str,
    event: &E,
    expected_seq: u64,
    config: &LedgerConfig,
) -> LedgerResult<u64> {
    validate_dir(dir)?;
    let directory_lock = DirectoryLock::new(dir).with_poll_interval(config.lock_poll_interval);
    directory_lock.acquire(agent_id, config.lock_timeout)?;
    let result = (|| {
        let next = scanner::next_sequence(dir)?;
        let observed = next - 1;
        if observed != expected_seq {
            return Err(LedgerError::SequenceMismatch {
                expected: expected_seq,
                observed,
            });
        }
        let bytes_written = write_one(dir, next, event, config.write)?;
        tracing::info!(
            agent = agent_id,
            dir = %dir.display(),
            seq = next,
            bytes = bytes_written,
            "ledger append committed"
        );
        Ok(next)
    })();
    lock::release_lock(&directory_lock, agent_id, "append_if_sequence");
    result
}

fn write_one<E: Event>(
    dir: &Path,
    seq: u64,
    event: &E,
    write_config: AtomicWriteConfig,
) -> LedgerResult<usize> {
    let bytes = serde_json::to_vec(event)?;
    let path = filename::event_file_path(dir, seq);
    atomic::write_atomic(&path, &bytes, write_config)?;
    Ok(bytes.len())
}

/// Appends `events` as a contiguous run starting at the current next
/// sequence. An empty `events` slice returns an empty result immediately
/// without acquiring the lock or touching the filesystem.
///
/// ## Partial-commit weakness (intentional — see `SPEC_FULL.md` §9)
///
/// All events are staged (written, fsynced, chmod'd) under temp names before
/// any rename happens. If a rename in the commit phase fails partway
/// through, the renames that already succeeded are **not** rolled back: the
/// batch is left partially committed. Remaining staged temp files are
/// cleaned up and the error is returned. This mirrors a known, documented
/// limitation rather than a principled all-or-nothing replacement — see the
/// open question in `SPEC_FULL.md` §9 for why.
pub fn append_batch<E: Event>(dir: &Path, agent_id: &str, events: &[E]) -> LedgerResult<Vec<u64>> {
    append_batch_with_timeout(dir, agent_id, events, DEFAULT_LOCK_TIMEOUT)
}

/// Timed form of [`append_batch`].
pub fn append_batch_with_timeout<E: Event>(
    dir: &Path,
    agent_id: &str,
    events: &[E],
    timeout: Duration,
) -> LedgerResult<Vec<u64>> {
    append_batch_with_config(
        dir,
        agent_id,
        events,
        &LedgerConfig {
            lock_timeout: timeout,
            ..LedgerConfig::default()
        },
    )
}

/// Full-config form of [`append_batch_with_timeout`]; see
/// [`append_with_config`] for why this variant exists.
pub fn append_batch_with_config<E: Event>(
    dir: &Path,
    agent_id: &str,
    events: &[E],
    config: &LedgerConfig,
) -> LedgerResult<Vec<u64>> {
    if events.is_empty() {
        return Ok(Vec::new());
    }
    validate_dir(dir)?;
    let directory_lock = DirectoryLock::new(dir).with_poll_interval(config.lock_poll_interval);
    directory_lock.acquire(agent_id, config.lock_timeout)?;
    let result = stage_and_commit(dir, agent_id, events, config.write);
    lock::release_lock(&directory_lock, agent_id, "append_batch");
    result
}

fn stage_and_commit<E: Event>(
    dir: &Path,
    agent_id: &str,
    events: &[E],
    write_config: AtomicWriteConfig,
) -> LedgerResult<Vec<u64>> {
    let start_seq = scanner::next_sequence(dir)?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(events.len());
    for (i, event) in events.iter().enumerate() {
        let seq = start_seq + i as u64;
        let final_path = filename::event_file_path(dir, seq);
        let bytes = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(source) => {
                cleanup_staged(&staged);
                return Err(LedgerError::Serialization(source));
            }
        };
        match atomic::stage(dir, &bytes) {
            Ok(temp_path) => staged.push((temp_path, final_path)),
            Err(err) => {
                cleanup_staged(&staged);
                return Err(err);
            }
        }
    }

    let mut committed = Vec::with_capacity(staged.len());
    for (i, (temp_path, final_path)) in staged.iter().enumerate() {
        if let Err(err) = atomic::commit(temp_path, final_path, write_config) {
            // Partial commit: `committed` entries up to this point stay on
            // disk. Remaining not-yet-renamed staged files are cleaned up.
            for (leftover_temp, _) in &staged[i + 1..] {
                let _ = std::fs::remove_file(leftover_temp);
            }
            tracing::warn!(
                agent = agent_id,
                dir = %dir.display(),
                committed = committed.len(),
                attempted = staged.len(),
                failed_seq = start_seq + i as u64,
                error = %err,
                "ledger batch append partially committed"
            );
            return Err(err);
        }
        committed.push(start_seq + i as u64);
    }
    tracing::info!(
        agent = agent_id,
        dir = %dir.display(),
        start_seq,
        count = committed.len(),
        "ledger batch append committed"
    );
    Ok(committed)
}

fn cleanup_staged(staged: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in staged {
        let _ = std::fs::remove_file(temp_path);
    }
}
