// ═══════════════════════════════════════════════════════════════════════════════
// Filename codec — bijection between sequence numbers and on-disk filenames
// Governance Tier: LAW
// Invariant: MONOTONE_NAMING
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Event files are named `NNNNNN.json`, zero-padded to at least six digits.
//! The width is a minimum, not a ceiling: sequence `1_234_567` widens naturally
//! to `1234567.json` rather than being rejected or truncated.

use std::path::{Path, PathBuf};

use crate::error::{LedgerError, LedgerResult};

/// Minimum zero-padded width of the numeric stem.
const MIN_WIDTH: usize = 6;

/// Suffix every event file carries.
const EVENT_SUFFIX: &str = ".json";

/// Renders the canonical filename for `seq`, e.g. `GenerateFilename(1)` → `"000001.json"`.
pub fn generate_filename(seq: u64) -> String {
    format!("{:0width$}{suffix}", seq, width = MIN_WIDTH, suffix = EVENT_SUFFIX)
}

/// Parses an event filename into its sequence number.
///
/// Rejects names that are empty, missing the `.json` suffix, have an empty
/// stem, a non-decimal stem, or a stem that does not fit in a `u64`. A stem of
/// all zeros parses successfully to `0` — callers that require a positive
/// event sequence must reject `0` themselves (see [`crate::scanner`]).
pub fn parse_filename(name: &str) -> LedgerResult<u64> {
    if name.is_empty() {
        return Err(LedgerError::invalid_argument("filename is empty"));
    }
    let stem = name.strip_suffix(EVENT_SUFFIX).ok_or_else(|| {
        LedgerError::invalid_argument(format!("filename {name:?} is missing .json suffix"))
    })?;
    if stem.is_empty() {
        return Err(LedgerError::invalid_argument(format!(
            "filename {name:?} has an empty stem"
        )));
    }
    if !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::invalid_argument(format!(
            "filename {name:?} has a non-decimal stem"
        )));
    }
    stem.parse::<u64>().map_err(|_| {
        LedgerError::invalid_argument(format!("filename {name:?} stem does not fit a u64"))
    })
}

/// Returns `true` iff `name` is a syntactically valid event filename.
///
/// Names with a leading dot (including the `.event-*.tmp` staging files and
/// `ledger.lock`) are never event files.
pub fn is_event_file(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    parse_filename(name).is_ok()
}

/// Joins `dir` and the canonical filename for `seq`.
pub fn event_file_path(dir: &Path, seq: u64) -> PathBuf {
    dir.join(generate_filename(seq))
}
