// ═══════════════════════════════════════════════════════════════════════════════
// config.rs — Ledger configuration
// Governance Tier: GUIDANCE
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! The knobs the core itself exposes, grouped into a plain struct with a
//! `Default` impl rather than a global singleton or environment-variable
//! reads — CLI/env parsing is out of scope at this layer (see `SPEC_FULL.md`
//! §10.3).

use std::time::Duration;

use crate::atomic::AtomicWriteConfig;
use crate::lock::DEFAULT_POLL_INTERVAL;

/// Default deadline for lock acquisition when a caller does not supply one
/// explicitly (`Append`/`AppendIfSequence`/`AppendBatch` without the
/// `_with_timeout` suffix).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration shared by every mutating ledger operation.
#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    /// Deadline for lock acquisition.
    pub lock_timeout: Duration,
    /// Interval between lock-acquisition polls.
    pub lock_poll_interval: Duration,
    /// Atomic-write durability knobs (parent-directory fsync).
    pub write: AtomicWriteConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll_interval: DEFAULT_POLL_INTERVAL,
            write: AtomicWriteConfig::default(),
        }
    }
}
