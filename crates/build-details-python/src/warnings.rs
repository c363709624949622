//! Recording Python warnings raised while the runtime is queried
//!
//! Wraps `warnings.catch_warnings(record=True)`. The context manager is
//! exited exactly once: by `finish`, or by `Drop` if collection bailed out.

use crate::errors::introspection_error;
use build_details_core::runtime::qualified_name;
use build_details_core::{BuildDetailsError, DiagnosticCapture, Warning};
use build_details_logger as logger;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};

pub struct WarningCapture<'py> {
    py: Python<'py>,
    catcher: Bound<'py, PyAny>,
    records: Bound<'py, PyAny>,
    active: bool,
}

impl<'py> WarningCapture<'py> {
    /// Enter a recording scope with every warning forced through
    pub fn enter(py: Python<'py>) -> Result<Self, BuildDetailsError> {
        let to_error = |e: PyErr| introspection_error(py, "warnings.catch_warnings", e);

        let warnings = PyModule::import(py, "warnings").map_err(to_error)?;
        let kwargs = PyDict::new(py);
        kwargs.set_item("record", true).map_err(to_error)?;
        let catcher = warnings
            .getattr("catch_warnings")
            .and_then(|cls| cls.call((), Some(&kwargs)))
            .map_err(to_error)?;
        let records = catcher.call_method0("__enter__").map_err(to_error)?;

        let capture = WarningCapture {
            py,
            catcher,
            records,
            active: true,
        };

        // filters are restored by __exit__, so this only affects the scope
        warnings
            .call_method1("simplefilter", ("always",))
            .map_err(to_error)?;

        logger::debug("Capturing Python warnings");
        Ok(capture)
    }

    fn exit(&mut self) -> PyResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let py = self.py;
        self.catcher
            .call_method1("__exit__", (py.None(), py.None(), py.None()))
            .map(|_| ())
    }

    fn convert(record: &Bound<'py, PyAny>) -> PyResult<Warning> {
        let message = record.getattr("message")?.str()?.to_string();
        let category = record.getattr("category")?;
        let module: String = category.getattr("__module__")?.extract()?;
        let qualname: String = category.getattr("__qualname__")?.extract()?;
        let filename = record.getattr("filename")?.str()?.to_string();
        let lineno: Option<u64> = record.getattr("lineno")?.extract()?;

        Ok(Warning {
            message,
            category: qualified_name(&module, &qualname),
            filename,
            lineno: lineno.unwrap_or(0),
        })
    }
}

impl DiagnosticCapture for WarningCapture<'_> {
    fn finish(mut self: Box<Self>) -> Result<Vec<Warning>, BuildDetailsError> {
        let py = self.py;
        self.exit()
            .map_err(|e| introspection_error(py, "warnings.catch_warnings", e))?;

        let mut warnings = Vec::new();
        let iter = self
            .records
            .try_iter()
            .map_err(|e| introspection_error(py, "recorded warnings", e))?;
        for record in iter {
            let warning = record
                .and_then(|record| Self::convert(&record))
                .map_err(|e| introspection_error(py, "recorded warnings", e))?;
            warnings.push(warning);
        }
        logger::debug(&format!("Captured {} Python warning(s)", warnings.len()));
        Ok(warnings)
    }
}

impl Drop for WarningCapture<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.exit() {
            logger::warn(&format!("Failed to restore Python warning filters: {}", e));
        }
    }
}
