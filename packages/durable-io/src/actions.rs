//! The closed set of recovery actions a user can be offered.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryAction {
    Retry,
    SaveAs,
    OpenSnapshot,
    Abort,
}

impl RecoveryAction {
    pub const ALL: [RecoveryAction; 4] = [
        RecoveryAction::Retry,
        RecoveryAction::SaveAs,
        RecoveryAction::OpenSnapshot,
        RecoveryAction::Abort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::Retry => "RETRY",
            RecoveryAction::SaveAs => "SAVE_AS",
            RecoveryAction::OpenSnapshot => "OPEN_SNAPSHOT",
            RecoveryAction::Abort => "ABORT",
        }
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecoveryAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or(())
    }
}

/// Keep the canonical actions in first-seen order; drop everything else.
///
/// Unknown strings are discarded silently, duplicates collapse.
pub fn normalize_recovery_actions<I, S>(actions: I) -> Vec<RecoveryAction>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for raw in actions {
        if let Ok(action) = raw.as_ref().trim().parse::<RecoveryAction>() {
            if !out.contains(&action) {
                out.push(action);
            }
        }
    }
    out
}
