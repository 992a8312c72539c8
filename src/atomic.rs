// ═══════════════════════════════════════════════════════════════════════════════
// atomic.rs — Atomic writer
// Governance Tier: LAW
// Invariant: ATOMIC_WRITE | FAIL_CLOSED
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Durable single-file write via the temp-file + fsync + rename protocol:
//! either the final bytes exist at `final_path`, or nothing does. Every error
//! path removes whatever temp file it created so a failed write never leaves
//! `.event-*.tmp` litter behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, LedgerResult};

/// File mode for committed event files (`0644`).
pub const EVENT_FILE_MODE: u32 = 0o644;

/// Write-and-rename configuration. Fields are knobs the core itself exposes;
/// see `SPEC_FULL.md` §10.3.
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriteConfig {
    /// Additionally fsync the parent directory after the rename. Strengthens
    /// durability on filesystems that do not guarantee rename durability
    /// without it; the core's correctness contract does not depend on this.
    pub fsync_parent_dir: bool,
}

impl Default for AtomicWriteConfig {
    fn default() -> Self {
        Self {
            fsync_parent_dir: true,
        }
    }
}

fn temp_path_in(dir: &Path) -> PathBuf {
    // A process- and call-unique suffix keeps concurrent writers in the same
    // directory from colliding on the staging file.
    let unique = format!(
        "{:x}-{:x}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    );
    dir.join(format!(".event-{unique}.tmp"))
}

fn cleanup(temp_path: &Path) {
    // Best-effort: a failure to remove a stale temp file must never mask the
    // primary error that triggered cleanup.
    let _ = fs::remove_file(temp_path);
}

/// Stage phase of the atomic write protocol: create a `.event-*.tmp` file in
/// `dir`, write `bytes` in full, fsync, close, and chmod it. Returns the temp
/// file's path without renaming it into place — used directly by
/// [`write_atomic`] and by `AppendBatch`'s multi-event stage phase.
///
/// On any failure the temp file this call created is removed before the
/// error is returned.
pub fn stage(dir: &Path, bytes: &[u8]) -> LedgerResult<PathBuf> {
    let temp_path = temp_path_in(dir);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|source| LedgerError::io("create temp file", &temp_path, source))?;

    if let Err(source) = temp_file.write_all(bytes) {
        cleanup(&temp_path);
        return Err(LedgerError::io("write temp file", &temp_path, source));
    }

    if let Err(source) = temp_file.sync_all() {
        cleanup(&temp_path);
        return Err(LedgerError::io("fsync temp file", &temp_path, source));
    }

    if let Err(source) = drop_and_check(temp_file) {
        cleanup(&temp_path);
        return Err(LedgerError::io("close temp file", &temp_path, source));
    }

    if let Err(source) = set_mode(&temp_path, EVENT_FILE_MODE) {
        cleanup(&temp_path);
        return Err(LedgerError::io("chmod temp file", &temp_path, source));
    }

    Ok(temp_path)
}

/// Commit phase: rename a staged temp file into its final location. On
/// failure the temp file is removed if it is still present (it may already
/// have been renamed away by a racing caller in pathological setups).
pub fn commit(temp_path: &Path, final_path: &Path, config: AtomicWriteConfig) -> LedgerResult<()> {
    if let Err(source) = fs::rename(temp_path, final_path) {
        cleanup(temp_path);
        return Err(LedgerError::io("rename temp file", final_path, source));
    }
    if config.fsync_parent_dir {
        if let Some(dir) = final_path.parent() {
            // Best-effort: the core's correctness contract does not depend on
            // this succeeding, only on the rename itself being atomic.
            let _ = File::open(dir).and_then(|d| d.sync_all());
        }
    }
    Ok(())
}

/// Writes `bytes` to `final_path` atomically: stage under a `.event-*.tmp`
/// name in the same directory as `final_path`, fsync, chmod, then rename.
pub fn write_atomic(final_path: &Path, bytes: &[u8], config: AtomicWriteConfig) -> LedgerResult<()> {
    let dir = final_path
        .parent()
        .ok_or_else(|| LedgerError::invalid_argument("final path has no parent directory"))?;
    let temp_path = stage(dir, bytes)?;
    commit(&temp_path, final_path, config)
}

fn drop_and_check(file: File) -> std::io::Result<()> {
    // `File`'s `Drop` impl ignores close errors; flush explicitly before the
    // value goes out of scope so a failing close surfaces as our own error.
    file.sync_all()?;
    drop(file);
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_final_bytes() {
        let dir = tempdir().unwrap();
        let final_path = dir.path().join("000001.json");
        write_atomic(&final_path, b"{\"type\":\"x\"}", AtomicWriteConfig::default()).unwrap();
        assert_eq!(fs::read(&final_path).unwrap(), b"{\"type\":\"x\"}");
    }

    #[test]
    fn leaves_no_temp_file_on_success() {
        let dir = tempdir().unwrap();
        let final_path = dir.path().join("000001.json");
        write_atomic(&final_path, b"{}", AtomicWriteConfig::default()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn sets_event_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let final_path = dir.path().join("000001.json");
        write_atomic(&final_path, b"{}", AtomicWriteConfig::default()).unwrap();
        let mode = fs::metadata(&final_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, EVENT_FILE_MODE);
    }

    #[test]
    fn fails_cleanly_when_parent_directory_is_missing() {
        let dir = tempdir().unwrap();
        let final_path = dir.path().join("missing-subdir").join("000001.json");
        let result = write_atomic(&final_path, b"{}", AtomicWriteConfig::default());
        assert!(result.is_err());
        assert!(!final_path.exists());
    }

    #[test]
    fn final_path_without_parent_is_invalid_argument() {
        let result = write_atomic(Path::new(""), b"{}", AtomicWriteConfig::default());
        assert!(result.is_err());
    }
}
