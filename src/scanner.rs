// ═══════════════════════════════════════════════════════════════════════════════
// scanner.rs — Sequence scanner
// Governance Tier: LAW
// Invariant: MONOTONE_NAMING | NO_GAPS
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Enumerates a ledger directory and reduces it to the sorted list of event
//! sequence numbers it contains. Directories and anything [`crate::filename`]
//! rejects (including `ledger.lock` and in-flight `.event-*.tmp` files) are
//! ignored rather than erroring — a ledger directory always contains some mix
//! of event files and transient bookkeeping files.

use std::path::{Path, PathBuf};

use crate::error::{LedgerError, LedgerResult};
use crate::filename::{self, parse_filename};

/// An event file's sequence number and full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFileEntry {
    pub seq: u64,
    pub path: PathBuf,
}

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

/// Returns the ascending-sorted list of valid event sequence numbers present
/// in `dir`. Sequence `0` (which `parse_filename` accepts syntactically) is
/// never included: it is not a valid event sequence.
pub fn sequences(dir: &Path) -> LedgerResult<Vec<u64>> {
    validate_dir(dir)?;
    let mut out = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|source| LedgerError::io("readdir", dir, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| LedgerError::io("readdir", dir, source))?;
        let file_type = entry
            .file_type()
            .map_err(|source| LedgerError::io("stat", entry.path(), source))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        match parse_filename(name) {
            Ok(seq) if seq >= 1 => out.push(seq),
            _ => continue,
        }
    }
    out.sort_unstable();
    Ok(out)
}

/// (max observed sequence, or 0 if none) + 1. Never fails on an empty
/// directory.
pub fn next_sequence(dir: &Path) -> LedgerResult<u64> {
    let seqs = sequences(dir)?;
    Ok(seqs.last().copied().unwrap_or(0) + 1)
}

/// Number of valid event files in `dir`.
pub fn count(dir: &Path) -> LedgerResult<usize> {
    Ok(sequences(dir)?.len())
}

/// `true` iff the sorted sequence list is not exactly `[1, 2, …, n]`. An
/// empty directory is gap-free.
pub fn has_gaps(dir: &Path) -> LedgerResult<bool> {
    let seqs = sequences(dir)?;
    for (i, seq) in seqs.iter().enumerate() {
        if *seq != (i as u64) + 1 {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Ascending-ordered `{seq, path}` entries for every event file in `dir`.
pub fn list_event_files(dir: &Path) -> LedgerResult<Vec<EventFileEntry>> {
    sequences(dir)?
        .into_iter()
        .map(|seq| {
            Ok(EventFileEntry {
                seq,
                path: filename::event_file_path(dir, seq),
            })
        })
        .collect()
}
