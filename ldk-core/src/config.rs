//! Fleet-wide startup configuration, loaded directly into typed structs via
//! `serde_yaml` rather than through a generic key-value indirection layer.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug)]
pub enum ConfigError {
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level fleet configuration: where state lives, which port the
/// management plane binds, and where the identity/permissions YAMLs are.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Root of the persisted state layout (spec §6): `data_dir/s3/...`,
    /// `data_dir/dynamodb/...`, etc.
    pub data_dir: PathBuf,

    /// Root management port `P`; service `svc_i` binds at `P + i + 1`.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Path to the identities YAML consumed by `ldk-security::IdentityStore`.
    pub identities_path: Option<PathBuf>,

    /// Path to a permissions-map override YAML, merged on top of the
    /// bundled default (spec SPEC_FULL.md §C1 additions).
    pub permissions_override_path: Option<PathBuf>,

    /// Debounce window for the file watcher, in milliseconds (spec §4.15).
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
}

fn default_base_port() -> u16 {
    4566
}

fn default_watch_debounce_ms() -> u64 {
    300
}

impl FleetConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// A minimal config pointing at a given data directory, used by tests
    /// and by `ldk-cli` when no config file is supplied.
    pub fn minimal(data_dir: impl Into<PathBuf>) -> Self {
        FleetConfig {
            data_dir: data_dir.into(),
            base_port: default_base_port(),
            identities_path: None,
            permissions_override_path: None,
            watch_debounce_ms: default_watch_debounce_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_uses_defaults() {
        let cfg = FleetConfig::minimal("/tmp/ldk-data");
        assert_eq!(cfg.base_port, 4566);
        assert_eq!(cfg.watch_debounce_ms, 300);
    }

    #[test]
    fn load_parses_yaml_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.yaml");
        std::fs::write(
            &path,
            "data_dir: /tmp/ldk-data\nbase_port: 5000\n",
        )
        .unwrap();
        let cfg = FleetConfig::load(&path).unwrap();
        assert_eq!(cfg.base_port, 5000);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/ldk-data"));
    }
}
