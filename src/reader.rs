// ═══════════════════════════════════════════════════════════════════════════════
// reader.rs — Reader/Scanner
// Governance Tier: LAW
// Invariant: READ_WRITE_SAFETY | PER_FILE_INTEGRITY
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! `ReadEvent`, `ReadAll`, and `Scan` — the read side of the ledger. Readers
//! never take the directory lock and never block writers; the guarantee they
//! provide is per-file integrity (an atomically renamed file is never
//! observed half-written), not a cross-file snapshot. A reader may miss the
//! tail of a concurrently-committing writer but never sees a torn or corrupt
//! event.

use std::path::Path;

use crate::error::{LedgerError, LedgerResult};
use crate::filename;
use crate::scanner;

/// Reads and validates the event at `seq` in `dir`.
///
/// Validates `seq >= 1`, reads the file, and confirms the bytes are
/// well-formed JSON before returning them. Distinguishes "file missing" from
/// "file present but corrupt".
pub fn read_event(dir: &Path, seq: u64) -> LedgerResult<Vec<u8>> {
    if seq < 1 {
        return Err(LedgerError::invalid_argument(format!(
            "sequence must be >= 1, got {seq}"
        )));
    }
    let path = filename::event_file_path(dir, seq);
    let bytes = std::fs::read(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LedgerError::NotFound {
                what: "event file",
                path: path.clone(),
            }
        } else {
            LedgerError::io("read event file", &path, source)
        }
    })?;
    validate_json(seq, &path, &bytes)?;
    Ok(bytes)
}

fn validate_json(seq: u64, path: &Path, bytes: &[u8]) -> LedgerResult<()> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|_| ())
        .map_err(|source| LedgerError::Corruption {
            seq,
            path: path.to_path_buf(),
            source,
        })
}

/// Reads every event in `dir` in ascending sequence order. An empty
/// directory yields an empty result, not an error.
pub fn read_all(dir: &Path) -> LedgerResult<Vec<Vec<u8>>> {
    scanner::list_event_files(dir)?
        .into_iter()
        .map(|entry| read_event(dir, entry.seq))
        .collect()
}

/// What a [`scan`] callback asks the scan loop to do next.
pub enum ScanFlow {
    /// Continue to the next event.
    Continue,
    /// Stop scanning cleanly; `scan` returns `Ok(())`.
    Stop,
}

/// Streaming form of [`read_all`]. Invokes `callback(seq, bytes)` for each
/// event in ascending order.
///
/// The callback returns `Ok(ScanFlow::Continue)` to proceed, `Ok(ScanFlow::Stop)`
/// to terminate cleanly (`scan` itself returns `Ok(())`), or `Err(_)` to abort
/// the scan with that error. A read error encountered by `scan` itself (not
/// the callback) is returned with the faulting sequence number attached, via
/// [`LedgerError::NotFound`] / [`LedgerError::Corruption`]'s own fields.
pub fn scan<F>(dir: &Path, mut callback: F) -> LedgerResult<()>
where
    F: FnMut(u64, &[u8]) -> LedgerResult<ScanFlow>,
{
    for entry in scanner::list_event_files(dir)? {
        let bytes = read_event(dir, entry.seq)?;
        match callback(entry.seq, &bytes)? {
            ScanFlow::Continue => continue,
            ScanFlow::Stop => return Ok(()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender;
    use serde::{Deserialize, Serialize};
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    struct TestEvent {
        #[serde(rename = "type")]
        kind: String,
        timestamp: String,
        payload: String,
    }

    impl crate::event::Event for TestEvent {
        fn event_type(&self) -> &str {
            &self.kind
        }
    }

    fn event(payload: &str) -> TestEvent {
        TestEvent {
            kind: "TEST_EVENT".to_string(),
            timestamp: "2026-07-28T00:00:00Z".to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn read_all_on_empty_dir_is_empty_not_error() {
        let dir = tempdir().unwrap();
        assert!(read_all(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn read_event_rejects_non_positive_sequence() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_event(dir.path(), 0),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn read_event_not_found_for_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_event(dir.path(), 1),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn read_event_reports_corruption_distinct_from_not_found() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("000001.json"), b"{not json").unwrap();
        assert!(matches!(
            read_event(dir.path(), 1),
            Err(LedgerError::Corruption { seq: 1, .. })
        ));
    }

    #[test]
    fn round_trip_append_then_read_and_deserialize() {
        let dir = tempdir().unwrap();
        let original = event("round-trip");
        let seq = appender::append(dir.path(), "writer", &original).unwrap();

        let bytes = read_event(dir.path(), seq).unwrap();
        let decoded: TestEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn read_all_returns_ascending_order() {
        let dir = tempdir().unwrap();
        for payload in ["a", "b", "c"] {
            appender::append(dir.path(), "writer", &event(payload)).unwrap();
        }
        let all = read_all(dir.path()).unwrap();
        let payloads: Vec<String> = all
            .iter()
            .map(|bytes| {
                serde_json::from_slice::<TestEvent>(bytes)
                    .unwrap()
                    .payload
            })
            .collect();
        assert_eq!(payloads, vec!["a", "b", "c"]);
    }

    #[test]
    fn scan_stops_after_kth_event() {
        let dir = tempdir().unwrap();
        for payload in ["a", "b", "c", "d"] {
            appender::append(dir.path(), "writer", &event(payload)).unwrap();
        }
        let mut seen = 0u64;
        scan(dir.path(), |_seq, _bytes| {
            seen += 1;
            if seen == 2 {
                Ok(ScanFlow::Stop)
            } else {
                Ok(ScanFlow::Continue)
            }
        })
        .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn scan_propagates_callback_error() {
        let dir = tempdir().unwrap();
        appender::append(dir.path(), "writer", &event("a")).unwrap();
        let result = scan(dir.path(), |_seq, _bytes| {
            Err(LedgerError::invalid_argument("callback refused"))
        });
        assert!(result.is_err());
    }
}
