//! Configuration loading for roots and templates
//!
//! Anatomy configuration is one TOML document with a `[roots]` table and a
//! `[templates]` table, usually maintained per project by the studio. This
//! module only deserializes the raw data; structural validation (root tree
//! shape, inner references, template syntax) happens when the configuration
//! is turned into an [`crate::Anatomy`].

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Raw anatomy configuration as loaded from disk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnatomyConfig {
    /// Name of the project this configuration belongs to
    pub project: Option<String>,
    /// Root path values by platform, possibly nested
    #[serde(default)]
    pub roots: toml::Table,
    /// Template strings grouped by usage
    #[serde(default)]
    pub templates: toml::Table,
}

impl AnatomyConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = AnatomyConfig::from_str(
            r#"
            project = "demo"

            [roots.work]
            windows = "P:/projects/work"
            linux = "/mnt/share/projects/work"

            [templates.work]
            folder = "{root[work]}/{project[name]}"
            "#,
        )
        .expect("Should parse");
        assert_eq!(config.project.as_deref(), Some("demo"));
        assert!(config.roots.contains_key("work"));
        assert!(config.templates.contains_key("work"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config = AnatomyConfig::from_str("").expect("Should parse");
        assert!(config.project.is_none());
        assert!(config.roots.is_empty());
        assert!(config.templates.is_empty());
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = AnatomyConfig::from_str("this is not valid toml {{{{");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
