//! # Recovery Snapshots
//!
//! Sibling backups named `.{basename}.bak.{tick}`, where `tick` comes from
//! an injected monotonic clock. Two snapshots taken on the same tick get an
//! ordinal suffix (`{tick}-{n}`). Ordering is always `(tick, ordinal)`, so
//! pruning is FIFO and does not depend on directory listing order or file
//! times.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::atomic::{atomic_write_file, parent_dir, SafetyMode, WriteOptions};
use crate::error::{DurableIoError, IoErrorCode, IoOp};

pub struct SnapshotOptions<'a> {
    /// Snapshots kept per file; `0` disables snapshotting
    pub max_snapshots: usize,

    /// Monotonic tick source
    pub now: &'a dyn Fn() -> u64,

    pub safety_mode: SafetyMode,
}

impl<'a> SnapshotOptions<'a> {
    pub fn new(max_snapshots: usize, now: &'a dyn Fn() -> u64) -> Self {
        Self {
            max_snapshots,
            now,
            safety_mode: SafetyMode::default(),
        }
    }
}

impl std::fmt::Debug for SnapshotOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotOptions")
            .field("max_snapshots", &self.max_snapshots)
            .field("safety_mode", &self.safety_mode)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub tick: u64,
    pub ordinal: u32,
    pub path: PathBuf,
}

fn snapshot_prefix(path: &Path) -> String {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{}.bak.", basename)
}

fn snapshot_name(prefix: &str, tick: u64, ordinal: u32) -> String {
    if ordinal == 0 {
        format!("{}{}", prefix, tick)
    } else {
        format!("{}{}-{}", prefix, tick, ordinal)
    }
}

/// `(tick, ordinal)` from a snapshot suffix, `None` for anything else
fn parse_suffix(suffix: &str) -> Option<(u64, u32)> {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match suffix.split_once('-') {
        Some((tick, ordinal)) if all_digits(tick) && all_digits(ordinal) => {
            Some((tick.parse().ok()?, ordinal.parse().ok()?))
        }
        None if all_digits(suffix) => Some((suffix.parse().ok()?, 0)),
        _ => None,
    }
}

/// Snapshots of `path`, oldest first.
pub fn list_recovery_snapshots(path: &Path) -> Result<Vec<SnapshotInfo>, DurableIoError> {
    let dir = parent_dir(path);
    let prefix = snapshot_prefix(path);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DurableIoError::new(IoErrorCode::ReadFail, IoOp::Snapshot, dir)
                .with_source(e))
        }
    };

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            DurableIoError::new(IoErrorCode::ReadFail, IoOp::Snapshot, dir).with_source(e)
        })?;
        let name = entry.file_name();
        let Some(suffix) = name.to_str().and_then(|n| n.strip_prefix(prefix.as_str())) else {
            continue;
        };
        if let Some((tick, ordinal)) = parse_suffix(suffix) {
            snapshots.push(SnapshotInfo {
                tick,
                ordinal,
                path: entry.path(),
            });
        }
    }

    snapshots.sort();
    Ok(snapshots)
}

/// Copy the current contents of `path` into a new snapshot, then prune.
///
/// Returns `None` when snapshotting is disabled or `path` does not exist
/// yet. The target itself is never modified.
pub fn create_recovery_snapshot(
    path: &Path,
    options: &SnapshotOptions<'_>,
) -> Result<Option<SnapshotInfo>, DurableIoError> {
    if options.max_snapshots == 0 {
        return Ok(None);
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DurableIoError::new(IoErrorCode::ReadFail, IoOp::Snapshot, path)
                .with_source(e)
                .reported(Some(options.safety_mode)))
        }
    };

    let existing = list_recovery_snapshots(path)?;
    let tick = (options.now)();
    let ordinal = existing
        .iter()
        .filter(|s| s.tick == tick)
        .map(|s| s.ordinal + 1)
        .max()
        .unwrap_or(0);

    let snapshot_path = parent_dir(path).join(snapshot_name(&snapshot_prefix(path), tick, ordinal));
    atomic_write_file(&snapshot_path, &bytes, &WriteOptions::new(options.safety_mode)).map_err(
        |err| {
            DurableIoError {
                op: IoOp::Snapshot,
                ..err
            }
            .with_snapshot(&snapshot_path)
        },
    )?;

    let created = SnapshotInfo {
        tick,
        ordinal,
        path: snapshot_path,
    };
    tracing::debug!(path = %created.path.display(), tick, ordinal, "recovery snapshot created");

    prune(existing, &created, options.max_snapshots);
    Ok(Some(created))
}

/// Drop the oldest snapshots so at most `max` remain, `created` included
fn prune(mut existing: Vec<SnapshotInfo>, created: &SnapshotInfo, max: usize) {
    existing.push(created.clone());
    existing.sort();

    let excess = existing.len().saturating_sub(max);
    for stale in existing.into_iter().take(excess) {
        match fs::remove_file(&stale.path) {
            Ok(()) => tracing::debug!(path = %stale.path.display(), "recovery snapshot pruned"),
            Err(e) => tracing::warn!(
                path = %stale.path.display(),
                error = %e,
                "failed to prune recovery snapshot"
            ),
        }
    }
}
