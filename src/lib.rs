//! Append-only, event-sourced ledger core.
//!
//! A `Ledger` is a directory on disk holding one JSON file per sequence
//! number. Writes are atomic (temp file + fsync + rename), ordering is
//! enforced by a cross-process exclusive lock, and readers never block on
//! writers. See [`Ledger`] for the primary entry point.

pub mod appender;
pub mod atomic;
pub mod config;
pub mod error;
pub mod event;
pub mod filename;
pub mod ledger;
pub mod lock;
pub mod observability;
pub mod reader;
pub mod scanner;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use event::Event;
pub use ledger::{Ledger, DEFAULT_APPEND_TIMEOUT};
pub use lock::LockRecord;
pub use reader::ScanFlow;
pub use scanner::EventFileEntry;
