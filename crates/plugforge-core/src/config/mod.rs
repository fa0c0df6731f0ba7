//! # Configuration Formats and Registry Settings
//!
//! Declarations and settings files may be written as JSON, YAML (feature
//! `yaml-config`) or TOML (feature `toml-config`); the format is picked from
//! the file extension. [`RegistrySettings`] describes where each scope's
//! declarations and module files live.
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
#[cfg(feature = "yaml-config")]
use serde_yaml;
#[cfg(feature = "toml-config")]
use toml;

use crate::kernel::constants::{KNOWN_MODULE_DIRS, MODULE_EXTENSION};
use crate::kernel::error::{Error, Result};
use crate::module_system::scope::Scope;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Extensions probed when locating a file by stem, in order.
    pub const PROBE_EXTENSIONS: &'static [&'static str] = &[
        "json",
        #[cfg(feature = "yaml-config")]
        "yaml",
        #[cfg(feature = "yaml-config")]
        "yml",
        #[cfg(feature = "toml-config")]
        "toml",
    ];

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Deserialize a value from string based on format
    pub fn deserialize<T: DeserializeOwned>(&self, data: &str) -> std::result::Result<T, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(data)
                .map_err(|e| format!("Failed to deserialize from JSON: {}", e)),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data)
                .map_err(|e| format!("Failed to deserialize from YAML: {}", e)),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => {
                toml::from_str(data).map_err(|e| format!("Failed to deserialize from TOML: {}", e))
            }
        }
    }
}

/// Find `<dir>/<stem>.<ext>` for the first supported extension that exists.
pub fn locate_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    ConfigFormat::PROBE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
}

/// Read and parse a configuration file, choosing the format by extension.
pub fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| Error::Config {
        path: path.to_path_buf(),
        message: "Unknown or unsupported config format".to_string(),
    })?;
    let content =
        fs::read_to_string(path).map_err(|e| Error::io(e, "read_config", path.to_path_buf()))?;
    format.deserialize(&content).map_err(|message| Error::Config {
        path: path.to_path_buf(),
        message,
    })
}

fn default_module_extension() -> String {
    MODULE_EXTENSION.to_string()
}

/// Where each scope's declarations and module files live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Directory of built-in/local declarations and modules
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
    /// Directory of application-wide declarations and modules
    #[serde(default)]
    pub application_dir: Option<PathBuf>,
    /// Extension of module files picked up by discovery
    #[serde(default = "default_module_extension")]
    pub module_extension: String,
    /// Skip the local scope entirely
    #[serde(default)]
    pub ignore_local_modules: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            local_dir: None,
            application_dir: None,
            module_extension: default_module_extension(),
            ignore_local_modules: false,
        }
    }
}

impl RegistrySettings {
    pub fn new(local_dir: Option<PathBuf>, application_dir: Option<PathBuf>) -> Self {
        Self {
            local_dir,
            application_dir,
            ..Self::default()
        }
    }

    /// Load settings from a JSON/YAML/TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        read_config_file(path)
    }

    /// Directory configured for `scope`, honouring `ignore_local_modules`.
    pub fn dir_for(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::Local if self.ignore_local_modules => None,
            Scope::Local => self.local_dir.as_deref(),
            Scope::Application => self.application_dir.as_deref(),
        }
    }
}

/// Well-known module directories under `base` that exist, deduplicated in order.
pub fn known_module_dirs(base: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for relative in KNOWN_MODULE_DIRS {
        let candidate = base.join(relative);
        if candidate.is_dir() && !dirs.contains(&candidate) {
            dirs.push(candidate);
        }
    }
    dirs
}
