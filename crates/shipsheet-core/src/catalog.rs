//! Catalog configuration: which groups are rendered and packed, which
//! directories are never scanned, and which files count as models.
//!
//! The configuration is validated once at startup. Traversal code only asks
//! it questions; it never pattern-matches directory names on its own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::StageError;

/// Whether a group takes part in rendering and packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPolicy {
    #[default]
    Include,
    Exclude,
}

/// Catalog configuration, usually loaded from `shipsheet.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Policy for groups not listed in `groups`.
    #[serde(default)]
    pub default_policy: GroupPolicy,

    /// Explicit per-group policies.
    #[serde(default)]
    pub groups: BTreeMap<String, GroupPolicy>,

    /// Directory names skipped at any depth.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Model file extensions, without the leading dot. Matched
    /// case-insensitively.
    #[serde(default = "default_model_extensions")]
    pub model_extensions: Vec<String>,

    /// Directory under the sprite root that receives packed sheets.
    #[serde(default = "default_sheets_dir")]
    pub sheets_dir: String,
}

fn default_excluded_dirs() -> Vec<String> {
    ["sheets", "audit_sheets", ".git", "__pycache__"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_model_extensions() -> Vec<String> {
    vec!["stl".to_string()]
}

fn default_sheets_dir() -> String {
    "sheets".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_policy: GroupPolicy::default(),
            groups: BTreeMap::new(),
            excluded_dirs: default_excluded_dirs(),
            model_extensions: default_model_extensions(),
            sheets_dir: default_sheets_dir(),
        }
    }
}

impl CatalogConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for contradictions and unusable names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.groups.keys() {
            check_dir_name("groups", name)?;
        }
        for name in &self.excluded_dirs {
            check_dir_name("excluded_dirs", name)?;
        }
        check_dir_name("sheets_dir", &self.sheets_dir)?;

        for (name, policy) in &self.groups {
            if *policy == GroupPolicy::Include && self.is_excluded_dir(name) {
                return Err(ConfigError::invalid(
                    "groups",
                    format!("group '{}' is included but also listed as an excluded directory", name),
                ));
            }
        }

        if self.model_extensions.is_empty() {
            return Err(ConfigError::invalid(
                "model_extensions",
                "at least one model extension is required",
            ));
        }
        for ext in &self.model_extensions {
            if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
                return Err(ConfigError::invalid(
                    "model_extensions",
                    format!("'{}' is not a bare file extension", ext),
                ));
            }
        }

        Ok(())
    }

    /// Effective policy for a group.
    pub fn policy_for(&self, group: &str) -> GroupPolicy {
        self.groups
            .get(group)
            .copied()
            .unwrap_or(self.default_policy)
    }

    /// True when `group` should be rendered and packed.
    pub fn includes_group(&self, group: &str) -> bool {
        !self.is_excluded_dir(group) && self.policy_for(group) == GroupPolicy::Include
    }

    /// True when a directory with this name is never scanned.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        name == self.sheets_dir || self.excluded_dirs.iter().any(|d| d == name)
    }

    /// True when `path` has one of the configured model extensions.
    pub fn is_model_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.model_extensions
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(ext))
            })
    }
}

fn check_dir_name(field: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' is not a plain directory name", name),
        ));
    }
    Ok(())
}

/// Errors loading the catalog configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON or has unknown fields.
    #[error("Failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),

    /// The configuration parsed but is contradictory or unusable.
    #[error("Invalid config field '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Creates a new invalid field error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

impl StageError for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_001",
            ConfigError::Parse(_) => "CONFIG_002",
            ConfigError::Invalid { .. } => "CONFIG_003",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}
