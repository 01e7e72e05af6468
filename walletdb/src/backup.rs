//! Timestamped file-copy backup snapshots with bounded retention, run on a
//! schedule external to the core (a caller invokes [`backup_wallet`]
//! periodically, the same way a caller drives [`crate::flush::DbRegistry`]).

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Error, Result};

/// Automatic backups are disabled (`N <= 0`).
pub const DISABLED: i64 = 0;
/// The backups directory could not be created.
pub const DIR_CREATE_FAILED: i64 = -1;
/// The wallet is locked against key derivation; no backup was produced.
pub const WALLET_LOCKED: i64 = -2;

/// Whether the wallet is open and, if so, whether it is currently locked
/// against key derivation. The core never inspects wallet internals
/// beyond this flag; refreshing the "keys left since last backup" counter
/// is the caller's responsibility once it learns a backup succeeded.
pub enum WalletState {
    /// No open wallet object; the file is copied at the filesystem level.
    Closed,
    /// An open wallet, with its lock-for-key-derivation status.
    Open { locked: bool },
}

/// Outcome of one [`backup_wallet`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum BackupOutcome {
    Disabled,
    DirCreateFailed,
    WalletLocked,
    /// A backup file already exists for this minute; refused, not an error.
    SkippedExistingFile(PathBuf),
    Created(PathBuf),
}

impl BackupOutcome {
    /// The legacy sentinel encoding for `N`, for callers that persist the
    /// retention count as a single configuration integer the way the
    /// source did: a directory-creation failure or a locked wallet
    /// overwrites the stored `N` with a negative sentinel rather than
    /// retrying next time.
    pub fn as_retain_sentinel(&self, previous_retain: i64) -> i64 {
        match self {
            BackupOutcome::Disabled => DISABLED,
            BackupOutcome::DirCreateFailed => DIR_CREATE_FAILED,
            BackupOutcome::WalletLocked => WALLET_LOCKED,
            BackupOutcome::SkippedExistingFile(_) | BackupOutcome::Created(_) => previous_retain,
        }
    }
}

/// Runs one backup pass for `wallet_name` (the stem backup files are
/// grouped under) whose live file is at `wallet_file`, writing snapshots
/// into `backups_dir` and retaining at most `retain` of them.
pub fn backup_wallet(
    backups_dir: &Path,
    wallet_file: &Path,
    wallet_name: &str,
    state: &WalletState,
    retain: i64,
) -> Result<BackupOutcome> {
    if retain <= 0 {
        return Ok(BackupOutcome::Disabled);
    }

    if !backups_dir.exists() {
        if std::fs::create_dir_all(backups_dir).is_err() {
            return Ok(BackupOutcome::DirCreateFailed);
        }
    }

    if let WalletState::Open { locked: true } = state {
        return Ok(BackupOutcome::WalletLocked);
    }

    let stamp = Local::now().format("%Y-%m-%d-%H-%M").to_string();
    let backup_path = backups_dir.join(format!("{wallet_name}.{stamp}"));

    if backup_path.exists() {
        log::warn!("backup: {} already exists, wallet likely restarted within the minute", backup_path.display());
        return Ok(BackupOutcome::SkippedExistingFile(backup_path));
    }

    std::fs::copy(wallet_file, &backup_path).map_err(|e| Error::Backup(e.to_string()))?;

    enforce_retention(backups_dir, wallet_name, retain as usize)?;

    Ok(BackupOutcome::Created(backup_path))
}

/// Enumerates every backup file for `wallet_name`, sorts by modification
/// time ascending, and deletes the oldest until at most `retain` remain.
fn enforce_retention(backups_dir: &Path, wallet_name: &str, retain: usize) -> Result<()> {
    let prefix = format!("{wallet_name}.");
    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(backups_dir).map_err(|e| Error::Backup(e.to_string()))? {
        let entry = entry.map_err(|e| Error::Backup(e.to_string()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(&prefix) {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).map_err(|e| Error::Backup(e.to_string()))?;
        candidates.push((modified, entry.path()));
    }

    candidates.sort_by_key(|(modified, _)| *modified);

    if candidates.len() > retain {
        let excess = candidates.len() - retain;
        for (_, path) in &candidates[..excess] {
            if let Err(e) = std::fs::remove_file(path) {
                log::warn!("backup: failed to prune {}: {e}", path.display());
            }
        }
    }

    Ok(())
}
