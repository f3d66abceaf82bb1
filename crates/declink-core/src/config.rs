//! Configuration resolution.
//!
//! declink has two settings: the marker name the attribute extractor looks
//! for, and the set of declaration languages the index accepts. Each is
//! resolved once per session with the following precedence (highest first):
//!
//! 1. CLI flags
//! 2. Environment variables (`DECLINK_MARKER_NAME`, `DECLINK_LANGUAGES`)
//! 3. Project config (`declink.toml`, `[declink]` table)
//! 4. Defaults (`LinkedTo`, `csharp`)
//!
//! ```toml
//! [declink]
//! marker_name = "Subject"
//! languages = ["csharp", "visual_basic"]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::declaration::Language;
use crate::error::ConfigError;

/// Marker name used when nothing else is configured.
pub const DEFAULT_MARKER_NAME: &str = "LinkedTo";

/// Project config file name, looked up in the workspace root.
pub const PROJECT_CONFIG_FILE: &str = "declink.toml";

pub const ENV_MARKER_NAME: &str = "DECLINK_MARKER_NAME";
pub const ENV_LANGUAGES: &str = "DECLINK_LANGUAGES";

// ============================================================================
// Config Values
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From declink.toml.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --marker flag.
    pub marker_name: Option<String>,
    /// --language flags.
    pub languages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    declink: ProjectSection,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectSection {
    marker_name: Option<String>,
    languages: Option<Vec<String>>,
}

// ============================================================================
// Link Config
// ============================================================================

/// Resolved session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub marker_name: ConfigValue<String>,
    pub languages: ConfigValue<Vec<Language>>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            marker_name: ConfigValue::new(DEFAULT_MARKER_NAME.to_string(), ConfigSource::Default),
            languages: ConfigValue::new(vec![Language::CSharp], ConfigSource::Default),
        }
    }
}

impl LinkConfig {
    /// Config with a fixed marker name and default languages.
    pub fn with_marker(marker_name: impl Into<String>) -> Self {
        LinkConfig {
            marker_name: ConfigValue::new(marker_name.into(), ConfigSource::CliFlag),
            ..LinkConfig::default()
        }
    }

    /// Resolve configuration from all sources, reading the process
    /// environment.
    pub fn resolve(workspace_root: &Path, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(workspace_root, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env<F>(
        workspace_root: &Path,
        overrides: &CliOverrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LinkConfig::default();

        let project_path = workspace_root.join(PROJECT_CONFIG_FILE);
        if project_path.exists() {
            config.apply_project_config(&project_path)?;
        }

        if let Some(marker) = env(ENV_MARKER_NAME) {
            config.set_marker(marker, ConfigSource::EnvVar);
        }
        if let Some(languages) = env(ENV_LANGUAGES) {
            let names: Vec<&str> = languages
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if names.is_empty() {
                debug!(var = ENV_LANGUAGES, "ignoring empty language list");
            } else {
                config.set_languages(&names, ConfigSource::EnvVar)?;
            }
        }

        if let Some(marker) = &overrides.marker_name {
            config.set_marker(marker.clone(), ConfigSource::CliFlag);
        }
        if !overrides.languages.is_empty() {
            let names: Vec<&str> = overrides.languages.iter().map(String::as_str).collect();
            config.set_languages(&names, ConfigSource::CliFlag)?;
        }

        debug!(
            marker = %config.marker_name.value,
            marker_source = ?config.marker_name.source,
            languages = ?config.languages.value,
            "resolved config"
        );
        Ok(config)
    }

    fn apply_project_config(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        let file: ProjectFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(marker) = file.declink.marker_name {
            self.set_marker(marker, ConfigSource::ProjectConfig);
        }
        if let Some(languages) = file.declink.languages {
            let names: Vec<&str> = languages.iter().map(String::as_str).collect();
            self.set_languages(&names, ConfigSource::ProjectConfig)?;
        }
        Ok(())
    }

    fn set_marker(&mut self, marker: String, source: ConfigSource) {
        let current = self.marker_name.clone();
        self.marker_name = current.merge(ConfigValue::new(marker, source));
    }

    fn set_languages(&mut self, names: &[&str], source: ConfigSource) -> Result<(), ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::NoLanguages { origin: source });
        }
        let languages = names
            .iter()
            .map(|name| {
                name.parse::<Language>()
                    .map_err(|_| ConfigError::UnknownLanguage {
                        name: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let current = self.languages.clone();
        self.languages = current.merge(ConfigValue::new(languages, source));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
