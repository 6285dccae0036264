use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sql::DEFAULT_PARAMETER_PREFIX;

/// What happens to a nested (table-part) reader once its parent leaves the
/// row that produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NestedReaderPolicy {
    /// Any further access fails with an invalid cursor state.
    #[default]
    Invalidate,
    /// The nested reader stays usable; the caller decides when to drop it.
    CallerManaged,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Placeholder names are `<prefix>1`, `<prefix>2`, ...
    pub parameter_prefix: String,
    pub nested_reader_policy: NestedReaderPolicy,
    /// Log every compiled command at info level instead of debug.
    pub trace_sql: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
            nested_reader_policy: NestedReaderPolicy::default(),
            trace_sql: false,
        }
    }
}

impl EngineConfig {
    pub fn get_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typedquery")
            .join("config.toml")
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        if config.parameter_prefix.is_empty()
            || !config
                .parameter_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            anyhow::bail!(
                "parameter_prefix must be a non-empty identifier, got {:?}",
                config.parameter_prefix
            );
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.parameter_prefix, "p");
        assert_eq!(config.nested_reader_policy, NestedReaderPolicy::Invalidate);
        assert!(!config.trace_sql);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("trace_sql = true").unwrap();
        assert!(config.trace_sql);
        assert_eq!(config.parameter_prefix, "p");
    }

    #[test]
    fn test_policy_spelling() {
        let config =
            EngineConfig::from_toml_str("nested_reader_policy = \"caller-managed\"").unwrap();
        assert_eq!(config.nested_reader_policy, NestedReaderPolicy::CallerManaged);
        assert!(EngineConfig::from_toml_str("nested_reader_policy = \"never\"").is_err());
    }

    #[test]
    fn test_rejects_bad_prefix() {
        assert!(EngineConfig::from_toml_str("parameter_prefix = \"\"").is_err());
        assert!(EngineConfig::from_toml_str("parameter_prefix = \"a b\"").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("typedquery-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let config = EngineConfig {
            parameter_prefix: "arg".into(),
            nested_reader_policy: NestedReaderPolicy::CallerManaged,
            trace_sql: true,
        };
        config.save_to(&path).unwrap();
        assert_eq!(EngineConfig::load_from(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("typedquery-does-not-exist.toml");
        assert_eq!(EngineConfig::load_from(&path).unwrap(), EngineConfig::default());
    }
}
