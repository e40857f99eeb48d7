//! Configuration management for annotation checking
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (annotations.toml)
//! - Environment variables (ANNOTATIONS__*)
//!
//! ## Example config file (annotations.toml):
//! ```toml
//! [checking]
//! enabled = true
//! expressions = false
//!
//! [diagnostics]
//! mapping_trail = "fresh"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::validator::{CheckOptions, MappingTrail};

/// Main configuration for annotation checking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Process-level switches
    #[serde(default)]
    pub checking: CheckingConfig,

    /// Diagnostic settings
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Process-level switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckingConfig {
    /// Check annotations at all; each annotated callable has its own switch too
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Install the built-in expression evaluator for textual annotations
    #[serde(default)]
    pub expressions: bool,
}

/// Diagnostic settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Trail used for the entries of a mapping annotation
    #[serde(default)]
    pub mapping_trail: MappingTrail,
}

fn default_true() -> bool {
    true
}

impl Default for CheckingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expressions: false,
        }
    }
}

impl AnnotationConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "annotations.toml",
            ".annotations.toml",
            "config/annotations.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "annotations") {
            let xdg_config = config_dir.config_dir().join("annotations.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("ANNOTATIONS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Validator options derived from the diagnostics section
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            mapping_trail: self.diagnostics.mapping_trail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnnotationConfig::default();
        assert!(config.checking.enabled);
        assert!(!config.checking.expressions);
        assert_eq!(config.diagnostics.mapping_trail, MappingTrail::Fresh);
    }

    #[test]
    fn test_serialize_config() {
        let config = AnnotationConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[checking]"));
        assert!(toml_str.contains("mapping_trail = \"fresh\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[checking]\nenabled = false\n\n[diagnostics]\nmapping_trail = \"inherit\"\n",
        )
        .unwrap();

        let config = AnnotationConfig::load_from(path.to_str()).unwrap();
        assert!(!config.checking.enabled);
        assert_eq!(config.check_options().mapping_trail, MappingTrail::Inherit);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = AnnotationConfig::default();
        config.checking.expressions = true;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = AnnotationConfig::load_from(path.to_str()).unwrap();
        assert!(loaded.checking.expressions);
    }
}
