use std::path::Path;

use serde::Serialize;

use crate::atomic::{atomic_write_file, WriteOptions, WriteReport};
use crate::error::DurableIoError;
use crate::snapshot::{create_recovery_snapshot, SnapshotInfo, SnapshotOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub write: WriteReport,
    pub snapshot: Option<SnapshotInfo>,
}

/// Snapshot the current file (if any), then atomically replace it.
///
/// A failed snapshot aborts the save; the target is left untouched.
pub fn save_markdown(
    path: &Path,
    content: &str,
    write: &WriteOptions<'_>,
    snapshots: &SnapshotOptions<'_>,
) -> Result<SaveReport, DurableIoError> {
    let snapshot = create_recovery_snapshot(path, snapshots)?;
    let write = atomic_write_file(path, content.as_bytes(), write)?;
    Ok(SaveReport { write, snapshot })
}
