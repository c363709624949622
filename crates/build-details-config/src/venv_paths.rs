//! Resolving the base installation behind a Python virtual environment
//!
//! A venv has no headers or libpython of its own; its `pyvenv.cfg` names the
//! installation it was created from, and that installation is what the
//! embedded interpreter must describe.

use std::fs;
use std::path::{Path, PathBuf};

/// The name of the binaries directory of an installation
/// "Scripts" on Windows venvs, "bin" on Unix
#[cfg(windows)]
pub const PYTHON_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const PYTHON_BIN_DIR: &str = "bin";

/// Error type for venv path resolution
#[derive(Debug, Clone)]
pub enum VenvPathError {
    /// The venv path does not exist or is not a directory
    VenvNotFound(PathBuf),
    /// `pyvenv.cfg` is missing or has no usable `home` entry
    PathResolution(String),
}

impl std::fmt::Display for VenvPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenvPathError::VenvNotFound(path) => {
                write!(f, "Virtual environment not found: {}", path.display())
            }
            VenvPathError::PathResolution(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for VenvPathError {}

/// Resolve PYTHONHOME from the venv's pyvenv.cfg file
///
/// The pyvenv.cfg file contains:
/// ```text
/// home = /path/to/python/installation/bin
/// include-system-site-packages = false
/// version = 3.12.1
/// ```
///
/// On Unix `home` is the installation's bin directory, so its parent is
/// returned. On Windows `home` is the installation root itself.
pub fn resolve_python_home(venv_path: &Path) -> Result<PathBuf, VenvPathError> {
    if !venv_path.is_dir() {
        return Err(VenvPathError::VenvNotFound(venv_path.to_path_buf()));
    }

    let pyvenv_cfg = venv_path.join("pyvenv.cfg");
    let content = fs::read_to_string(&pyvenv_cfg).map_err(|e| {
        VenvPathError::PathResolution(format!(
            "Failed to read {}: {}",
            pyvenv_cfg.display(),
            e
        ))
    })?;

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "home" {
            continue;
        }
        let home = PathBuf::from(value.trim());
        if home.file_name().is_some_and(|name| name == PYTHON_BIN_DIR) {
            if let Some(parent) = home.parent() {
                return Ok(parent.to_path_buf());
            }
        }
        return Ok(home);
    }

    Err(VenvPathError::PathResolution(format!(
        "Could not find 'home' in pyvenv.cfg: {}",
        pyvenv_cfg.display()
    )))
}
