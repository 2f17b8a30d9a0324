//! Side-channel diagnostic records for durable I/O failures.
//!
//! Records go out on the `manuscript::reliability` tracing target so a host
//! can route them to its own sink. Nothing reads them back.

use serde::{Deserialize, Serialize};

use crate::actions::RecoveryAction;
use crate::atomic::SafetyMode;

pub const RELIABILITY_SCHEMA_VERSION: u32 = 1;

pub const RELIABILITY_TARGET: &str = "manuscript::reliability";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilityRecord {
    pub schema_version: u32,
    pub op: String,
    pub code: String,
    pub reason: String,
    pub safety_mode: Option<SafetyMode>,
    pub source_path: Option<String>,
    pub target_path: Option<String>,
    pub snapshot_path: Option<String>,
    pub recovery_actions: Vec<RecoveryAction>,
}

impl ReliabilityRecord {
    pub fn to_json(&self) -> String {
        // plain strings, enums and options: serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn emit(&self) {
        tracing::error!(
            target: "manuscript::reliability",
            op = %self.op,
            code = %self.code,
            record = %self.to_json(),
            "durable io failure"
        );
    }
}
