// ═══════════════════════════════════════════════════════════════════════════════
// error.rs — Ledger Core: Error Types
// Governance Tier: LAW
// Invariant: FAIL_CLOSED | NO_SILENT_SWALLOW
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! One error enum covers every behavioral category the ledger core can
//! surface. [`LedgerError::SequenceMismatch`] is a sentinel rather than an
//! ordinary failure and must stay identifiable by `matches!`/pattern match,
//! not by formatted-message comparison. The `Scan` callback's own early-stop
//! sentinel is a plain enum (see [`crate::reader::ScanFlow`]) rather than a
//! variant of this type, since stopping a scan is not itself an error.

use std::path::PathBuf;

use thiserror::Error;

/// Ledger error types.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Empty directory path, empty agent id, non-positive sequence, malformed
    /// filename input, or any other caller-supplied value that is structurally
    /// invalid before a filesystem call is even attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required directory or event file does not exist.
    #[error("not found: {what} at {path}")]
    NotFound { what: &'static str, path: PathBuf },

    /// `path` exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A read, write, rename, chmod, or fsync syscall failed.
    #[error("io error during {op} on {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Event file bytes are not well-formed JSON.
    #[error("corrupt event at sequence {seq} ({}): {source}", path.display())]
    Corruption {
        seq: u64,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `Acquire` did not obtain the lock before its deadline.
    #[error("lock acquisition by {agent:?} on {} timed out after {waited_ms} ms", dir.display())]
    LockTimeout {
        agent: String,
        dir: PathBuf,
        waited_ms: u64,
    },

    /// `Release` discovered an on-disk owner that does not match the caller,
    /// or the record was overwritten by a foreign owner while held.
    #[error("lock ownership mismatch: expected {expected:?}, found {found:?}")]
    LockOwnershipMismatch { expected: String, found: String },

    /// The same lock instance was re-acquired with a different agent id.
    /// Non-retryable: this is a caller programming error, never a timeout.
    #[error("lock misuse: instance already held by {held_by:?}, re-acquired as {requested_by:?}")]
    LockMisuse {
        held_by: String,
        requested_by: String,
    },

    /// `AppendIfSequence` observed a sequence other than the one the caller
    /// expected. The event was not written.
    #[error("sequence mismatch: expected {expected}, observed {observed}")]
    SequenceMismatch { expected: u64, observed: u64 },

    /// JSON (de)serialization failure not tied to a specific on-disk file.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }

    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// `true` iff this error is [`LedgerError::SequenceMismatch`].
    ///
    /// Exposed so CAS callers can branch on the sentinel by identity rather
    /// than by string-matching the rendered message.
    pub const fn is_sequence_mismatch(&self) -> bool {
        matches!(self, LedgerError::SequenceMismatch { .. })
    }

    /// `true` iff this error is a non-retryable lock misuse — a programming
    /// error on the caller's part, never resolved by retrying or waiting.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::LockMisuse { .. })
    }

    /// Numeric error code for cross-boundary (FFI/log-aggregation) consumers.
    pub const fn error_code(&self) -> u32 {
        match self {
            LedgerError::InvalidArgument(_) => 1001,
            LedgerError::NotFound { .. } => 1002,
            LedgerError::NotADirectory(_) => 1003,
            LedgerError::Io { .. } => 1004,
            LedgerError::Corruption { .. } => 1005,
            LedgerError::LockTimeout { .. } => 1006,
            LedgerError::LockOwnershipMismatch { .. } => 1007,
            LedgerError::LockMisuse { .. } => 1008,
            LedgerError::SequenceMismatch { .. } => 1009,
            LedgerError::Serialization(_) => 2001,
        }
    }
}
