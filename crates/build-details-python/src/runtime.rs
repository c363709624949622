//! `RuntimeIntrospector` over the embedded interpreter
//!
//! Every query is a plain attribute read or call on `sys`, `sysconfig` or
//! `importlib.machinery`. Values that are not plain strings are passed through
//! Python's own `json` module so that whatever the runtime hands back is
//! represented exactly as it would be by a Python-side dump.

use crate::errors::introspection_error;
use crate::warnings::WarningCapture;
use build_details_core::{
    BuildDetailsError, DiagnosticCapture, RuntimeIntrospector, Section, SuffixKind, VersionInfo,
};
use build_details_logger as logger;
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub struct PythonRuntime<'py> {
    py: Python<'py>,
    sys: Bound<'py, PyModule>,
    sysconfig: Bound<'py, PyModule>,
    machinery: Bound<'py, PyModule>,
    json: Bound<'py, PyModule>,
}

impl<'py> PythonRuntime<'py> {
    pub fn new(py: Python<'py>) -> Result<Self, BuildDetailsError> {
        let import = |name: &str| {
            PyModule::import(py, name).map_err(|e| introspection_error(py, name, e))
        };
        Ok(PythonRuntime {
            py,
            sys: import("sys")?,
            sysconfig: import("sysconfig")?,
            machinery: import("importlib.machinery")?,
            json: import("json")?,
        })
    }

    fn query<T>(
        &self,
        query: &str,
        f: impl FnOnce() -> PyResult<T>,
    ) -> Result<T, BuildDetailsError> {
        f().map_err(|e| introspection_error(self.py, query, e))
    }

    /// Round-trip a Python object through `json.dumps`
    fn to_value(&self, query: &str, obj: &Bound<'py, PyAny>) -> Result<Value, BuildDetailsError> {
        let text: String = match self
            .json
            .call_method1("dumps", (obj,))
            .and_then(|dumped| dumped.extract())
        {
            Ok(text) => text,
            Err(e) if e.is_instance_of::<PyTypeError>(self.py) => {
                return Err(BuildDetailsError::Serialization(format!(
                    "{}: {}",
                    query,
                    e.value(self.py)
                )))
            }
            Err(e) => return Err(introspection_error(self.py, query, e)),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn version_fields(
        &self,
        query: &str,
        obj: &Bound<'py, PyAny>,
    ) -> Result<VersionInfo, BuildDetailsError> {
        self.query(query, || {
            Ok(VersionInfo {
                major: obj.getattr("major")?.extract()?,
                minor: obj.getattr("minor")?.extract()?,
                micro: obj.getattr("micro")?.extract()?,
                releaselevel: obj.getattr("releaselevel")?.extract()?,
                serial: obj.getattr("serial")?.extract()?,
            })
        })
    }

    /// `<scripts>/python<VERSION><EXE>`, for when `sys.executable` is the host binary
    fn derived_executable(&self) -> Result<Option<String>, BuildDetailsError> {
        let Some(scripts) = self.install_path("scripts")? else {
            return Ok(None);
        };
        let exe_suffix = match self.config_var("EXE")? {
            Value::String(suffix) => suffix,
            _ => String::new(),
        };
        let name = if cfg!(windows) {
            format!("python{}", exe_suffix)
        } else {
            format!("python{}{}", self.python_version()?, exe_suffix)
        };
        Ok(Some(
            Path::new(&scripts).join(name).to_string_lossy().into_owned(),
        ))
    }
}

/// Whether `executable` is the process we are running in
fn is_host_process(executable: &str) -> bool {
    let Ok(host) = std::env::current_exe() else {
        return false;
    };
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| PathBuf::from(p));
    canonical(Path::new(executable)) == canonical(&host)
}

impl RuntimeIntrospector for PythonRuntime<'_> {
    fn capture_diagnostics(&self) -> Result<Box<dyn DiagnosticCapture + '_>, BuildDetailsError> {
        Ok(Box::new(WarningCapture::enter(self.py)?))
    }

    fn config_var(&self, name: &str) -> Result<Value, BuildDetailsError> {
        let query = format!("sysconfig.get_config_var({:?})", name);
        let value = self.query(&query, || {
            self.sysconfig.call_method1("get_config_var", (name,))
        })?;
        self.to_value(&query, &value)
    }

    fn platform(&self) -> Result<String, BuildDetailsError> {
        self.query("sysconfig.get_platform()", || {
            self.sysconfig.call_method0("get_platform")?.extract()
        })
    }

    fn python_version(&self) -> Result<String, BuildDetailsError> {
        self.query("sysconfig.get_python_version()", || {
            self.sysconfig.call_method0("get_python_version")?.extract()
        })
    }

    fn version_info(&self) -> Result<VersionInfo, BuildDetailsError> {
        let info = self.query("sys.version_info", || self.sys.getattr("version_info"))?;
        self.version_fields("sys.version_info", &info)
    }

    fn implementation(&self) -> Result<Section, BuildDetailsError> {
        let attrs = self.query("vars(sys.implementation)", || {
            let implementation = self.sys.getattr("implementation")?;
            PyModule::import(self.py, "builtins")?
                .getattr("vars")?
                .call1((implementation,))
        })?;
        match self.to_value("vars(sys.implementation)", &attrs)? {
            Value::Object(section) => Ok(section),
            other => Err(BuildDetailsError::introspection(
                "vars(sys.implementation)",
                format!("expected a mapping, found {}", other),
            )),
        }
    }

    fn implementation_version(&self) -> Result<VersionInfo, BuildDetailsError> {
        let version = self.query("sys.implementation.version", || {
            self.sys.getattr("implementation")?.getattr("version")
        })?;
        self.version_fields("sys.implementation.version", &version)
    }

    fn executable(&self) -> Result<Option<String>, BuildDetailsError> {
        let executable: Option<String> = self.query("sys.executable", || {
            self.sys.getattr("executable")?.extract()
        })?;
        match executable {
            Some(path) if path.is_empty() => Ok(None),
            Some(path) if is_host_process(&path) => {
                logger::debug(&format!(
                    "sys.executable is the host process ({}), deriving the interpreter path",
                    path
                ));
                self.derived_executable()
            }
            other => Ok(other),
        }
    }

    fn abiflags(&self) -> Result<String, BuildDetailsError> {
        self.query("sys.abiflags", || self.sys.getattr("abiflags")?.extract())
    }

    fn suffixes(&self, kind: SuffixKind) -> Result<Vec<String>, BuildDetailsError> {
        let query = format!("importlib.machinery.{}", kind.machinery_attr());
        self.query(&query, || {
            self.machinery.getattr(kind.machinery_attr())?.extract()
        })
    }

    fn install_path(&self, name: &str) -> Result<Option<String>, BuildDetailsError> {
        let query = format!("sysconfig.get_path({:?})", name);
        self.query(&query, || {
            self.sysconfig.call_method1("get_path", (name,))?.extract()
        })
    }
}
