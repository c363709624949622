//! Configuration for the build-details CLI
//!
//! The config file is optional TOML. Every key has a built-in default and every
//! key can be overridden from the command line.

pub mod venv_paths;

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that points at an alternate config file
pub const CONFIG_ENV_VAR: &str = "BUILD_DETAILS_CONFIG";

/// Schema version emitted when neither the CLI nor the config names one
pub const DEFAULT_SCHEMA_VERSION: &str = "1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Could not determine home directory")]
    NoHomeDir,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_paths: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl Config {
    /// Location of the config file
    ///
    /// `BUILD_DETAILS_CONFIG` wins when set and non-empty, otherwise the
    /// platform default under the user's config directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        #[cfg(not(target_os = "windows"))]
        let default = dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".config")
            .join("build-details")
            .join("build-details.toml");

        #[cfg(target_os = "windows")]
        let default = dirs::config_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join("build-details")
            .join("build-details.toml");

        Ok(default)
    }

    /// Load the config from its default location; a missing file is an empty config
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get_schema_version(&self) -> String {
        self.schema_version
            .clone()
            .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string())
    }

    pub fn get_relative_paths(&self) -> bool {
        self.relative_paths.unwrap_or(false)
    }

    /// Python home to hand the embedded interpreter, if any
    ///
    /// An explicit `python-home` takes priority over one derived from
    /// `venv-path`'s `pyvenv.cfg`.
    pub fn resolve_python_home(&self) -> Result<Option<PathBuf>, venv_paths::VenvPathError> {
        if let Some(ref home) = self.python_home {
            return Ok(Some(PathBuf::from(home)));
        }
        match self.venv_path {
            Some(ref venv) => venv_paths::resolve_python_home(Path::new(venv)).map(Some),
            None => Ok(None),
        }
    }

    /// Apply command-line overrides on top of the file values
    pub fn merge(mut self, overrides: Config) -> Config {
        if overrides.schema_version.is_some() {
            self.schema_version = overrides.schema_version;
        }
        if overrides.relative_paths.is_some() {
            self.relative_paths = overrides.relative_paths;
        }
        if overrides.venv_path.is_some() {
            self.venv_path = overrides.venv_path;
            // a venv on the command line replaces a configured home
            if overrides.python_home.is_none() {
                self.python_home = None;
            }
        }
        if overrides.python_home.is_some() {
            self.python_home = overrides.python_home;
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
        self
    }
}
