use build_details_core::runtime::qualified_name;
use build_details_core::BuildDetailsError;
use pyo3::prelude::*;
use pyo3::types::{PyTracebackMethods, PyTypeMethods};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while bringing up the embedded interpreter
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Python error: {0}")]
    Python(String),

    #[error("Python home not found or not a directory: {}", .0.display())]
    PythonHomeNotFound(PathBuf),

    #[error(
        "No Python standard library under {}: expected {expected}",
        .home.display()
    )]
    StdlibNotFound { home: PathBuf, expected: String },

    #[error("Failed to initialize Python interpreter: {0}")]
    Initialization(String),
}

/// Generic conversion from PyErr to BridgeError.
///
/// NOTE: This conversion loses the Python traceback information!
/// Introspection failures go through `introspection_error()` instead.
impl From<PyErr> for BridgeError {
    fn from(err: PyErr) -> Self {
        BridgeError::Python(format!("{}", err))
    }
}

impl From<BridgeError> for BuildDetailsError {
    fn from(err: BridgeError) -> Self {
        BuildDetailsError::introspection("interpreter startup", err.to_string())
    }
}

/// `module.qualname` of the exception class behind `err`
pub(crate) fn exception_kind(py: Python<'_>, err: &PyErr) -> String {
    let ty = err.get_type(py);
    let module = ty.module().map(|m| m.to_string()).unwrap_or_default();
    let qualname = ty
        .qualname()
        .map(|q| q.to_string())
        .unwrap_or_else(|_| "BaseException".to_string());
    qualified_name(&module, &qualname)
}

/// Convert a failed query into an introspection error, keeping the traceback
pub(crate) fn introspection_error(py: Python<'_>, query: &str, err: PyErr) -> BuildDetailsError {
    let kind = exception_kind(py, &err);
    let message = err.value(py).to_string();
    let trace = err
        .traceback(py)
        .and_then(|tb| tb.format().ok())
        .map(|tb| format!("{}{}: {}\n", tb, kind, message));

    BuildDetailsError::Introspection {
        query: query.to_string(),
        message: format!("{}: {}", kind, message),
        source_kind: Some(kind),
        trace,
    }
}
