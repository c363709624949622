//! Embedded interpreter bootstrap
//!
//! The interpreter can only be initialized once per process, so the bridge
//! is a lazily-initialized singleton. `PYTHONHOME` has to be in place before
//! that happens; it selects the installation the interpreter reports on.

use crate::errors::BridgeError;
use crate::runtime::PythonRuntime;
use build_details_core::{BuildDetailsError, BuildDetailsOutput, GenerateOptions};
use build_details_logger as logger;
use once_cell::sync::OnceCell;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use std::env;
#[cfg(not(windows))]
use std::fs;
use std::path::{Path, PathBuf};

/// Handle to the initialized interpreter
pub struct Bridge {
    python_home: Option<PathBuf>,
}

/// Global bridge singleton
static BRIDGE_INSTANCE: OnceCell<Result<Bridge, BridgeError>> = OnceCell::new();

impl Bridge {
    /// Get or initialize the bridge singleton
    ///
    /// `python_home` only takes effect on the first call.
    pub fn get(python_home: Option<&Path>) -> Result<&'static Bridge, BridgeError> {
        match BRIDGE_INSTANCE.get_or_init(|| Bridge::initialize(python_home)) {
            Ok(bridge) => {
                if python_home.is_some() && python_home != bridge.python_home.as_deref() {
                    logger::warn("Python interpreter already initialized; ignoring new Python home");
                }
                Ok(bridge)
            }
            Err(e) => Err(BridgeError::Initialization(format!("{}", e))),
        }
    }

    fn initialize(python_home: Option<&Path>) -> Result<Bridge, BridgeError> {
        let start_time = std::time::Instant::now();

        if let Some(home) = python_home {
            if !home.is_dir() {
                return Err(BridgeError::PythonHomeNotFound(home.to_path_buf()));
            }
            // CPython exits the process if it cannot import `encodings` at startup
            match find_stdlib(home) {
                Some(encodings) => {
                    logger::debug(&format!("Found standard library at {}", encodings.display()));
                }
                None => {
                    return Err(BridgeError::StdlibNotFound {
                        home: home.to_path_buf(),
                        expected: expected_stdlib_layout(),
                    })
                }
            }
            env::set_var("PYTHONHOME", home);
            logger::debug(&format!("Set PYTHONHOME={}", home.display()));
        }

        pyo3::Python::initialize();

        let version = pyo3::Python::attach(|py| {
            let sys = PyModule::import(py, "sys")
                .map_err(|e| BridgeError::Python(format!("Failed to import sys module: {}", e)))?;
            let version: String = sys.getattr("version")?.extract()?;
            Ok::<String, BridgeError>(version)
        })?;
        logger::debug(&format!(
            "Embedded Python {} initialized in {:?}",
            version.lines().next().unwrap_or_default(),
            start_time.elapsed()
        ));

        Ok(Bridge {
            python_home: python_home.map(Path::to_path_buf),
        })
    }

    pub fn python_home(&self) -> Option<&Path> {
        self.python_home.as_deref()
    }

    /// Collect the build-details output for the embedded interpreter
    pub fn collect(
        &self,
        options: &GenerateOptions,
    ) -> Result<BuildDetailsOutput, BuildDetailsError> {
        pyo3::Python::attach(|py| {
            let runtime = PythonRuntime::new(py)?;
            build_details_core::collect(&runtime, options)
        })
    }
}

/// Directory of the linked interpreter's standard library under `<home>/lib`
///
/// Debug builds link `python3.12d` but install into `python3.12`; free-threaded
/// builds keep the `t` suffix.
#[cfg(not(windows))]
fn linked_stdlib_name() -> Option<String> {
    let lib_name = pyo3_build_config::get().lib_name.as_deref()?;
    let name = lib_name.strip_suffix('d').unwrap_or(lib_name);
    name.starts_with("python3.").then(|| name.to_string())
}

#[cfg(not(windows))]
fn expected_stdlib_layout() -> String {
    let name = linked_stdlib_name().unwrap_or_else(|| "python3.*".to_string());
    format!("lib/{}/encodings", name)
}

#[cfg(windows)]
fn expected_stdlib_layout() -> String {
    "Lib/encodings".to_string()
}

/// The `encodings` package the linked interpreter would import from `home`
#[cfg(not(windows))]
fn find_stdlib(home: &Path) -> Option<PathBuf> {
    let linked = linked_stdlib_name();
    ["lib", "lib64"]
        .iter()
        .map(|libdir| home.join(libdir))
        .find_map(|libdir| {
            let candidates: Vec<PathBuf> = match linked {
                Some(ref name) => vec![libdir.join(name)],
                None => fs::read_dir(&libdir)
                    .ok()?
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.file_name()
                            .and_then(|name| name.to_str())
                            .is_some_and(|name| name.starts_with("python3."))
                    })
                    .collect(),
            };
            candidates
                .into_iter()
                .map(|dir| dir.join("encodings"))
                .find(|encodings| encodings.is_dir())
        })
}

#[cfg(windows)]
fn find_stdlib(home: &Path) -> Option<PathBuf> {
    let encodings = home.join("Lib").join("encodings");
    encodings.is_dir().then_some(encodings)
}
