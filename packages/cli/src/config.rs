use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use manuscript_io::{ReadOptions, SafetyMode, DEFAULT_MAX_INPUT_BYTES};
use manuscript_views::CapabilitySnapshot;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_NAME: &str = "manuscript.config.json";

/// Manuscript project configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Core state file, relative to the project directory
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Event log file, relative to the project directory
    #[serde(default = "default_event_log_file")]
    pub event_log_file: String,

    /// Recovery snapshots kept per file (0 disables)
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,

    /// Largest file the editor will open
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,

    #[serde(default)]
    pub safety_mode: SafetyMode,

    /// View capability flags; absent means enabled
    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
}

fn default_state_file() -> String {
    "manuscript.state.json".to_string()
}

fn default_event_log_file() -> String {
    "manuscript.events.json".to_string()
}

fn default_max_snapshots() -> usize {
    5
}

fn default_max_input_bytes() -> u64 {
    DEFAULT_MAX_INPUT_BYTES
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, safety_mode: Option<SafetyMode>, max_snapshots: Option<usize>) -> Self {
        if let Some(mode) = safety_mode {
            self.safety_mode = mode;
        }
        if let Some(max) = max_snapshots {
            self.max_snapshots = max;
        }
        self
    }

    pub fn state_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.state_file)
    }

    pub fn event_log_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.event_log_file)
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::default().with_max_bytes(self.max_input_bytes)
    }

    pub fn capability_snapshot(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::from_features(self.capabilities.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            event_log_file: default_event_log_file(),
            max_snapshots: default_max_snapshots(),
            max_input_bytes: default_max_input_bytes(),
            safety_mode: SafetyMode::Durable,
            capabilities: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "stateFile": "book/state.json",
            "maxSnapshots": 2,
            "safetyMode": "atomic",
            "capabilities": { "mindMapGraph": false }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.state_file, "book/state.json");
        assert_eq!(config.event_log_file, "manuscript.events.json");
        assert_eq!(config.max_snapshots, 2);
        assert_eq!(config.max_input_bytes, 8 * 1024 * 1024);
        assert_eq!(config.safety_mode, SafetyMode::Atomic);
        assert!(config.capability_snapshot().is_disabled("mindMapGraph"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_snapshots, 5);
        assert_eq!(config.safety_mode, SafetyMode::Durable);
        assert!(config.capabilities.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(Some(SafetyMode::Atomic), Some(0));
        assert_eq!(config.safety_mode, SafetyMode::Atomic);
        assert_eq!(config.max_snapshots, 0);

        let untouched = Config::default().with_overrides(None, None);
        assert_eq!(untouched, Config::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }
}
