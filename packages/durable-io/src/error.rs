//! # Durable I/O Errors
//!
//! Every failure carries a stable code, the operation and path involved,
//! and the recovery actions a user may be offered. These are the only
//! errors in the workspace expected to reach an end user, so each one also
//! has a plain-language [`DurableIoError::user_message`].

use std::path::{Path, PathBuf};

use manuscript_common::{Details, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::actions::RecoveryAction;
use crate::atomic::SafetyMode;
use crate::reliability::ReliabilityRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoErrorCode {
    #[serde(rename = "E_IO_INPUT_TOO_LARGE")]
    InputTooLarge,
    #[serde(rename = "E_IO_INVALID_ENCODING")]
    InvalidEncoding,
    #[serde(rename = "E_IO_TRUNCATED_INPUT")]
    TruncatedInput,
    #[serde(rename = "E_IO_CORRUPT_INPUT")]
    CorruptInput,
    #[serde(rename = "E_IO_INTEGRITY_MISMATCH")]
    IntegrityMismatch,
    #[serde(rename = "E_IO_ATOMIC_WRITE_FAIL")]
    AtomicWriteFail,
    #[serde(rename = "E_IO_SNAPSHOT_MISSING")]
    SnapshotMissing,
    #[serde(rename = "E_IO_SNAPSHOT_MISMATCH")]
    SnapshotMismatch,
    #[serde(rename = "E_IO_READ_FAIL")]
    ReadFail,
}

impl IoErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IoErrorCode::InputTooLarge => "E_IO_INPUT_TOO_LARGE",
            IoErrorCode::InvalidEncoding => "E_IO_INVALID_ENCODING",
            IoErrorCode::TruncatedInput => "E_IO_TRUNCATED_INPUT",
            IoErrorCode::CorruptInput => "E_IO_CORRUPT_INPUT",
            IoErrorCode::IntegrityMismatch => "E_IO_INTEGRITY_MISMATCH",
            IoErrorCode::AtomicWriteFail => "E_IO_ATOMIC_WRITE_FAIL",
            IoErrorCode::SnapshotMissing => "E_IO_SNAPSHOT_MISSING",
            IoErrorCode::SnapshotMismatch => "E_IO_SNAPSHOT_MISMATCH",
            IoErrorCode::ReadFail => "E_IO_READ_FAIL",
        }
    }

    /// Reason used when the failure site does not give a narrower one
    pub fn default_reason(&self) -> &'static str {
        match self {
            IoErrorCode::InputTooLarge => "input_too_large",
            IoErrorCode::InvalidEncoding => "invalid_encoding",
            IoErrorCode::TruncatedInput => "truncated_input",
            IoErrorCode::CorruptInput => "corrupt_input",
            IoErrorCode::IntegrityMismatch => "integrity_mismatch",
            IoErrorCode::AtomicWriteFail => "atomic_write_failed",
            IoErrorCode::SnapshotMissing => "snapshot_missing",
            IoErrorCode::SnapshotMismatch => "snapshot_mismatch",
            IoErrorCode::ReadFail => "read_failed",
        }
    }

    pub fn default_actions(&self) -> Vec<RecoveryAction> {
        use RecoveryAction::*;
        match self {
            IoErrorCode::InputTooLarge => vec![Abort],
            IoErrorCode::InvalidEncoding
            | IoErrorCode::TruncatedInput
            | IoErrorCode::CorruptInput
            | IoErrorCode::IntegrityMismatch => vec![OpenSnapshot, Abort],
            IoErrorCode::AtomicWriteFail => vec![Retry, SaveAs, Abort],
            IoErrorCode::SnapshotMissing => vec![SaveAs, Abort],
            IoErrorCode::SnapshotMismatch => vec![Abort],
            IoErrorCode::ReadFail => vec![Retry, Abort],
        }
    }

    /// Content-level damage that an older snapshot may not share
    pub fn is_recoverable_from_snapshot(&self) -> bool {
        matches!(
            self,
            IoErrorCode::InvalidEncoding
                | IoErrorCode::TruncatedInput
                | IoErrorCode::CorruptInput
                | IoErrorCode::IntegrityMismatch
        )
    }
}

impl std::fmt::Display for IoErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation a durable I/O error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoOp {
    #[serde(rename = "io.read")]
    Read,
    #[serde(rename = "io.atomicWrite")]
    AtomicWrite,
    #[serde(rename = "io.snapshot")]
    Snapshot,
    #[serde(rename = "io.recover")]
    Recover,
}

impl IoOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            IoOp::Read => "io.read",
            IoOp::AtomicWrite => "io.atomicWrite",
            IoOp::Snapshot => "io.snapshot",
            IoOp::Recover => "io.recover",
        }
    }

    /// Whether the error's path is written to rather than read from
    pub fn writes_target(&self) -> bool {
        matches!(self, IoOp::AtomicWrite | IoOp::Snapshot)
    }
}

impl std::fmt::Display for IoOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("{code}: {reason} ({})", .path.display())]
pub struct DurableIoError {
    pub code: IoErrorCode,
    pub reason: String,
    pub op: IoOp,
    pub path: PathBuf,
    pub snapshot_path: Option<PathBuf>,
    pub recovery_actions: Vec<RecoveryAction>,
    pub details: Details,
    #[source]
    pub source: Option<std::io::Error>,
}

impl DurableIoError {
    pub fn new(code: IoErrorCode, op: IoOp, path: impl Into<PathBuf>) -> Self {
        Self {
            code,
            reason: code.default_reason().to_string(),
            op,
            path: path.into(),
            snapshot_path: None,
            recovery_actions: code.default_actions(),
            details: Details::new(),
            source: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: std::io::Error) -> Self {
        self.details
            .insert("osError".to_string(), Value::String(source.to_string()));
        self.source = Some(source);
        self
    }

    pub fn with_snapshot(mut self, snapshot_path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(snapshot_path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Message safe to show to an end user: no OS error text, no internals
    pub fn user_message(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());

        match self.code {
            IoErrorCode::InputTooLarge => {
                format!("\"{}\" is too large to open safely.", name)
            }
            IoErrorCode::InvalidEncoding => {
                format!("\"{}\" is not valid UTF-8 text.", name)
            }
            IoErrorCode::TruncatedInput => {
                format!("\"{}\" appears to be cut off mid-character.", name)
            }
            IoErrorCode::CorruptInput => {
                format!("\"{}\" contains damaged data.", name)
            }
            IoErrorCode::IntegrityMismatch => {
                format!("\"{}\" changed since it was last saved.", name)
            }
            IoErrorCode::AtomicWriteFail => {
                format!("\"{}\" could not be saved. The previous version is intact.", name)
            }
            IoErrorCode::SnapshotMissing => {
                format!("\"{}\" is damaged and no backup is available.", name)
            }
            IoErrorCode::SnapshotMismatch => {
                format!("\"{}\" is damaged and its backups could not be read.", name)
            }
            IoErrorCode::ReadFail => format!("\"{}\" could not be read.", name),
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        let mut envelope = ErrorEnvelope::new(self.code.as_str(), self.op.as_str(), self.reason.clone())
            .with_detail("path", self.path.display().to_string());
        for (key, value) in &self.details {
            envelope.details.insert(key.clone(), value.clone());
        }
        envelope
    }

    pub fn reliability_record(&self, safety_mode: Option<SafetyMode>) -> ReliabilityRecord {
        let path = Some(self.path.display().to_string());
        let (source_path, target_path) = if self.op.writes_target() {
            (None, path)
        } else {
            (path, None)
        };

        ReliabilityRecord {
            schema_version: crate::reliability::RELIABILITY_SCHEMA_VERSION,
            op: self.op.as_str().to_string(),
            code: self.code.as_str().to_string(),
            reason: self.reason.clone(),
            safety_mode,
            source_path,
            target_path,
            snapshot_path: self
                .snapshot_path
                .as_ref()
                .map(|p| p.display().to_string()),
            recovery_actions: self.recovery_actions.clone(),
        }
    }

    /// Emit the reliability record for this error and hand it back
    pub(crate) fn reported(self, safety_mode: Option<SafetyMode>) -> Self {
        self.reliability_record(safety_mode).emit();
        self
    }
}
