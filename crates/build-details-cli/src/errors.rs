//! Errors surfaced by the build-details binary

use build_details_config::venv_paths::VenvPathError;
use build_details_config::ConfigError;
use build_details_core::BuildDetailsError;
use build_details_python::BridgeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to resolve Python home: {0}")]
    Venv(#[from] VenvPathError),

    #[error("Failed to start the Python interpreter: {0}")]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Generation(#[from] BuildDetailsError),

    #[error("Failed to write {}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },
}

impl CliError {
    /// Name reported as `error.kind` in the failure payload
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Config(_) | CliError::Venv(_) => "ConfigurationError",
            CliError::Bridge(_) => "EnvironmentIntrospectionError",
            CliError::Generation(e) => e.kind(),
            CliError::Output { .. } => "OutputError",
        }
    }

    /// Runtime traceback to show on stderr, if there is one
    pub fn trace(&self) -> Option<&str> {
        match self {
            CliError::Generation(e) => e.trace(),
            _ => None,
        }
    }
}
