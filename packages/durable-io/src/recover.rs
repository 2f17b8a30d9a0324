//! # Snapshot Recovery
//!
//! When the primary file is damaged (bad encoding, truncation, NUL bytes,
//! integrity mismatch) fall back to the newest snapshot that reads cleanly.
//! Other failures, such as a missing file or an oversized one, are returned
//! as-is: an older copy would not help.

use std::path::{Path, PathBuf};

use manuscript_common::ErrorEnvelope;
use serde::{Deserialize, Serialize};

use crate::actions::RecoveryAction;
use crate::atomic::{atomic_write_file, WriteOptions};
use crate::error::{DurableIoError, IoErrorCode, IoOp};
use crate::read::{read_checked, ReadOptions};
use crate::snapshot::list_recovery_snapshots;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Primary,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveredDocument {
    pub content: String,
    pub source_path: PathBuf,
    pub source_kind: SourceKind,
    pub recovered_from_snapshot: bool,
    pub recovery_action: Option<RecoveryAction>,

    /// Why the primary was not used
    pub primary_error: Option<ErrorEnvelope>,

    /// Set by [`replay_markdown_recovery`] when it rewrote the primary
    #[serde(default)]
    pub restored_primary: bool,
}

/// Read `path`, falling back to its snapshots if the content is damaged.
pub fn read_markdown_with_recovery(
    path: &Path,
    options: &ReadOptions,
) -> Result<RecoveredDocument, DurableIoError> {
    recover(path, options).map_err(|err| err.reported(None))
}

/// [`read_markdown_with_recovery`], then write the recovered content back
/// over the primary so the next plain read succeeds.
///
/// Running it again after a successful restore reads the primary directly.
pub fn replay_markdown_recovery(
    path: &Path,
    options: &ReadOptions,
    write: &WriteOptions<'_>,
) -> Result<RecoveredDocument, DurableIoError> {
    let mut document = read_markdown_with_recovery(path, options)?;

    if document.recovered_from_snapshot {
        atomic_write_file(path, document.content.as_bytes(), write)?;
        document.restored_primary = true;
        tracing::info!(
            path = %path.display(),
            snapshot = %document.source_path.display(),
            "primary restored from snapshot"
        );
    }

    Ok(document)
}

fn recover(path: &Path, options: &ReadOptions) -> Result<RecoveredDocument, DurableIoError> {
    let primary_error = match read_checked(path, options) {
        Ok(doc) => {
            return Ok(RecoveredDocument {
                content: doc.content,
                source_path: doc.path,
                source_kind: SourceKind::Primary,
                recovered_from_snapshot: false,
                recovery_action: None,
                primary_error: None,
                restored_primary: false,
            })
        }
        Err(err) if err.code.is_recoverable_from_snapshot() => err,
        Err(err) => return Err(err),
    };

    tracing::warn!(
        path = %path.display(),
        code = %primary_error.code,
        "primary unreadable, trying snapshots"
    );

    let snapshots = list_recovery_snapshots(path)?;
    if snapshots.is_empty() {
        return Err(
            DurableIoError::new(IoErrorCode::SnapshotMissing, IoOp::Recover, path)
                .with_detail("primaryCode", primary_error.code.as_str()),
        );
    }

    // the integrity hash describes the primary, not its backups
    let snapshot_options = ReadOptions {
        expected_sha256: None,
        ..options.clone()
    };

    let mut newest_failure: Option<DurableIoError> = None;
    for snapshot in snapshots.iter().rev() {
        match read_checked(&snapshot.path, &snapshot_options) {
            Ok(doc) => {
                tracing::warn!(
                    path = %path.display(),
                    snapshot = %snapshot.path.display(),
                    "recovered from snapshot"
                );
                return Ok(RecoveredDocument {
                    content: doc.content,
                    source_path: doc.path,
                    source_kind: SourceKind::Snapshot,
                    recovered_from_snapshot: true,
                    recovery_action: Some(RecoveryAction::OpenSnapshot),
                    primary_error: Some(primary_error.to_envelope()),
                    restored_primary: false,
                });
            }
            Err(err) => {
                tracing::debug!(snapshot = %snapshot.path.display(), code = %err.code, "snapshot unusable");
                newest_failure.get_or_insert(err);
            }
        }
    }

    let mut err = DurableIoError::new(IoErrorCode::SnapshotMismatch, IoOp::Recover, path)
        .with_detail("primaryCode", primary_error.code.as_str())
        .with_detail("snapshotCount", snapshots.len());
    if let Some(snapshot_err) = newest_failure {
        err = err
            .with_detail("snapshotCode", snapshot_err.code.as_str())
            .with_snapshot(snapshot_err.path);
    }
    Err(err)
}
