//! In-memory runtime for exercising the collector

use crate::document::{Section, VersionInfo};
use crate::errors::BuildDetailsError;
use crate::runtime::{DiagnosticCapture, RuntimeIntrospector, SuffixKind, Warning};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct FakeRuntime {
    config_vars: HashMap<String, Value>,
    platform: String,
    abiflags: String,
    executable: Option<String>,
    suffixes: HashMap<&'static str, Vec<String>>,
    install_paths: HashMap<String, String>,
    warnings: Vec<(String, Warning)>,
    fail_on: Option<String>,
    captured: RefCell<Option<Vec<Warning>>>,
    reported: RefCell<Vec<Warning>>,
}

impl FakeRuntime {
    /// A Debian-style CPython 3.12 install under /usr
    pub fn linux() -> Self {
        let config_vars = [
            ("prefix", json!("/usr")),
            ("EXT_SUFFIX", json!(".cpython-312-x86_64-linux-gnu.so")),
            ("LIBDIR", json!("/usr/lib/x86_64-linux-gnu")),
            ("LDLIBRARY", json!("libpython3.12.so")),
            ("LIBRARY", json!("libpython3.12.a")),
            ("LIBPYTHON", json!("-lpython3.12")),
            ("LIBPC", json!("/usr/lib/x86_64-linux-gnu/pkgconfig")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let suffixes = [
            (SuffixKind::Source, vec![".py"]),
            (SuffixKind::Bytecode, vec![".pyc"]),
            (SuffixKind::OptimizedBytecode, vec![".pyc"]),
            (SuffixKind::DebugBytecode, vec![".pyc"]),
            (
                SuffixKind::Extensions,
                vec![".cpython-312-x86_64-linux-gnu.so", ".abi3.so", ".so"],
            ),
        ]
        .into_iter()
        .map(|(kind, list)| {
            (
                kind.machinery_attr(),
                list.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        FakeRuntime {
            config_vars,
            platform: "linux-x86_64".to_string(),
            abiflags: String::new(),
            executable: Some("/usr/bin/python3.12".to_string()),
            suffixes,
            install_paths: HashMap::from([(
                "include".to_string(),
                "/usr/include/python3.12".to_string(),
            )]),
            warnings: Vec::new(),
            fail_on: None,
            captured: RefCell::new(None),
            reported: RefCell::new(Vec::new()),
        }
    }

    pub fn with_config_var(mut self, name: &str, value: Value) -> Self {
        self.config_vars.insert(name.to_string(), value);
        self
    }

    pub fn with_suffixes(mut self, kind: SuffixKind, list: &[&str]) -> Self {
        self.suffixes.insert(
            kind.machinery_attr(),
            list.iter().map(|s| (*s).to_string()).collect(),
        );
        self
    }

    pub fn with_abiflags(mut self, flags: &str) -> Self {
        self.abiflags = flags.to_string();
        self
    }

    /// Raise `warning` every time `query` runs
    pub fn warn_on(mut self, query: &str, warning: Warning) -> Self {
        self.warnings.push((query.to_string(), warning));
        self
    }

    /// Make `query` fail
    pub fn fail_on(mut self, query: &str) -> Self {
        self.fail_on = Some(query.to_string());
        self
    }

    pub fn is_capturing(&self) -> bool {
        self.captured.borrow().is_some()
    }

    /// Warnings that went to the normal reporting channel
    pub fn reported(&self) -> Vec<Warning> {
        self.reported.borrow().clone()
    }

    fn query(&self, name: &str) -> Result<(), BuildDetailsError> {
        for (query, warning) in &self.warnings {
            if query == name {
                match self.captured.borrow_mut().as_mut() {
                    Some(buffer) => buffer.push(warning.clone()),
                    None => self.reported.borrow_mut().push(warning.clone()),
                }
            }
        }
        if self.fail_on.as_deref() == Some(name) {
            return Err(BuildDetailsError::introspection(name, "simulated failure"));
        }
        Ok(())
    }
}

struct FakeCapture<'a> {
    runtime: &'a FakeRuntime,
}

impl DiagnosticCapture for FakeCapture<'_> {
    fn finish(self: Box<Self>) -> Result<Vec<Warning>, BuildDetailsError> {
        Ok(self.runtime.captured.borrow_mut().take().unwrap_or_default())
    }
}

impl Drop for FakeCapture<'_> {
    fn drop(&mut self) {
        self.runtime.captured.borrow_mut().take();
    }
}

impl RuntimeIntrospector for FakeRuntime {
    fn capture_diagnostics(&self) -> Result<Box<dyn DiagnosticCapture + '_>, BuildDetailsError> {
        *self.captured.borrow_mut() = Some(Vec::new());
        Ok(Box::new(FakeCapture { runtime: self }))
    }

    fn config_var(&self, name: &str) -> Result<Value, BuildDetailsError> {
        self.query(name)?;
        Ok(self.config_vars.get(name).cloned().unwrap_or(Value::Null))
    }

    fn platform(&self) -> Result<String, BuildDetailsError> {
        self.query("platform")?;
        Ok(self.platform.clone())
    }

    fn python_version(&self) -> Result<String, BuildDetailsError> {
        self.query("python_version")?;
        Ok("3.12".to_string())
    }

    fn version_info(&self) -> Result<VersionInfo, BuildDetailsError> {
        self.query("version_info")?;
        Ok(cpython_312())
    }

    fn implementation(&self) -> Result<Section, BuildDetailsError> {
        self.query("implementation")?;
        let Value::Object(section) = json!({
            "name": "cpython",
            "cache_tag": "cpython-312",
            "version": [3, 12, 1, "final", 0],
            "hexversion": 51_118_576,
            "_multiarch": "x86_64-linux-gnu",
        }) else {
            return Ok(Section::new());
        };
        Ok(section)
    }

    fn implementation_version(&self) -> Result<VersionInfo, BuildDetailsError> {
        self.query("implementation_version")?;
        Ok(cpython_312())
    }

    fn executable(&self) -> Result<Option<String>, BuildDetailsError> {
        self.query("executable")?;
        Ok(self.executable.clone())
    }

    fn abiflags(&self) -> Result<String, BuildDetailsError> {
        self.query("abiflags")?;
        Ok(self.abiflags.clone())
    }

    fn suffixes(&self, kind: SuffixKind) -> Result<Vec<String>, BuildDetailsError> {
        self.query(kind.machinery_attr())?;
        Ok(self
            .suffixes
            .get(kind.machinery_attr())
            .cloned()
            .unwrap_or_default())
    }

    fn install_path(&self, name: &str) -> Result<Option<String>, BuildDetailsError> {
        self.query(name)?;
        Ok(self.install_paths.get(name).cloned())
    }
}

fn cpython_312() -> VersionInfo {
    VersionInfo {
        major: 3,
        minor: 12,
        micro: 1,
        releaselevel: "final".to_string(),
        serial: 0,
    }
}
