//! Registry configuration.
//!
//! Loaded from the environment or from a YAML file:
//!
//! ```yaml
//! disabled_mappers: [generic]
//! vocabulary_path: /etc/mappers/vocabulary.yaml
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::builtin_registrations;
use crate::vocabulary::GcmdVocabulary;

/// Comma-separated mapper names to leave out of the registry.
pub const ENV_DISABLED: &str = "MAPPER_DISABLED";
/// Path of a YAML vocabulary override file.
pub const ENV_VOCABULARY: &str = "MAPPER_VOCABULARY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Mappers skipped during discovery
    pub disabled_mappers: Vec<String>,
    /// Vocabulary override file merged over the built-in table
    pub vocabulary_path: Option<PathBuf>,
}

impl MapperConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let disabled_mappers = lookup(ENV_DISABLED)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let vocabulary_path = lookup(ENV_VOCABULARY)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            disabled_mappers,
            vocabulary_path,
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// Disabling a mapper that is not registered is an error, so typos do
    /// not go unnoticed.
    pub fn from_yaml(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let known: Vec<&str> = builtin_registrations().iter().map(|r| r.name).collect();
        for name in &self.disabled_mappers {
            if !known.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "cannot disable unknown mapper '{}' (known: {})",
                    name,
                    known.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_mappers.iter().any(|d| d == name)
    }

    /// Built-in vocabulary, merged with the override file if one is set.
    pub fn vocabulary(&self) -> Result<GcmdVocabulary, ConfigError> {
        match &self.vocabulary_path {
            Some(path) => GcmdVocabulary::from_yaml_file(path),
            None => Ok(GcmdVocabulary::builtin()),
        }
    }
}
