//! The seam between the collector and a live runtime
//!
//! Each method is one independent, read-only introspection source. The
//! collector never talks to an interpreter directly, so the same assembly
//! logic runs against the embedded interpreter and against test fixtures.

use crate::document::{Section, VersionInfo};
use crate::errors::BuildDetailsError;
use serde::Serialize;
use serde_json::Value;

/// The file-suffix lists a runtime recognizes for importable modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixKind {
    Source,
    Bytecode,
    OptimizedBytecode,
    DebugBytecode,
    Extensions,
}

impl SuffixKind {
    /// Every kind, in the order the `suffixes` section lists them
    pub const ALL: [SuffixKind; 5] = [
        SuffixKind::Source,
        SuffixKind::Bytecode,
        SuffixKind::OptimizedBytecode,
        SuffixKind::DebugBytecode,
        SuffixKind::Extensions,
    ];

    /// Key under the `suffixes` section
    pub fn key(self) -> &'static str {
        match self {
            SuffixKind::Source => "source",
            SuffixKind::Bytecode => "bytecode",
            SuffixKind::OptimizedBytecode => "optimized_bytecode",
            SuffixKind::DebugBytecode => "debug_bytecode",
            SuffixKind::Extensions => "extensions",
        }
    }

    /// Attribute name on `importlib.machinery`
    pub fn machinery_attr(self) -> &'static str {
        match self {
            SuffixKind::Source => "SOURCE_SUFFIXES",
            SuffixKind::Bytecode => "BYTECODE_SUFFIXES",
            SuffixKind::OptimizedBytecode => "OPTIMIZED_BYTECODE_SUFFIXES",
            SuffixKind::DebugBytecode => "DEBUG_BYTECODE_SUFFIXES",
            SuffixKind::Extensions => "EXTENSION_SUFFIXES",
        }
    }
}

/// One diagnostic raised by the runtime while it was being queried
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub message: String,
    /// `<module>.<qualified-name>` of the diagnostic's class
    pub category: String,
    pub filename: String,
    pub lineno: u64,
}

impl Warning {
    /// Build a record, joining the category's module and qualified name
    pub fn new(
        message: impl Into<String>,
        category_module: &str,
        category_qualname: &str,
        filename: impl Into<String>,
        lineno: u64,
    ) -> Self {
        Warning {
            message: message.into(),
            category: qualified_name(category_module, category_qualname),
            filename: filename.into(),
            lineno,
        }
    }
}

/// `module.qualname`, or just `qualname` when the module is unknown
pub fn qualified_name(module: &str, qualname: &str) -> String {
    if module.is_empty() {
        qualname.to_string()
    } else {
        format!("{}.{}", module, qualname)
    }
}

/// An active diagnostic-capture scope
///
/// Implementations must restore the runtime's previous diagnostic handling
/// when dropped, so that an early return or unwind out of collection never
/// leaves capture switched on.
pub trait DiagnosticCapture {
    /// End the scope and return what was recorded, in emission order
    fn finish(self: Box<Self>) -> Result<Vec<Warning>, BuildDetailsError>;
}

/// Read-only queries against a language runtime
pub trait RuntimeIntrospector {
    /// Start recording diagnostics instead of reporting them
    fn capture_diagnostics(&self) -> Result<Box<dyn DiagnosticCapture + '_>, BuildDetailsError>;

    /// A build configuration variable; `Value::Null` when unset
    fn config_var(&self, name: &str) -> Result<Value, BuildDetailsError>;

    /// Platform identifier, e.g. `linux-x86_64`
    fn platform(&self) -> Result<String, BuildDetailsError>;

    /// Short language version, e.g. `3.12`
    fn python_version(&self) -> Result<String, BuildDetailsError>;

    fn version_info(&self) -> Result<VersionInfo, BuildDetailsError>;

    /// Every attribute of the implementation object, in the runtime's order
    fn implementation(&self) -> Result<Section, BuildDetailsError>;

    fn implementation_version(&self) -> Result<VersionInfo, BuildDetailsError>;

    /// Interpreter executable; `None` when the runtime cannot tell
    fn executable(&self) -> Result<Option<String>, BuildDetailsError>;

    /// ABI flag characters as one string, e.g. `"td"`
    fn abiflags(&self) -> Result<String, BuildDetailsError>;

    fn suffixes(&self, kind: SuffixKind) -> Result<Vec<String>, BuildDetailsError>;

    /// A named installation path from the default scheme, e.g. `include`
    fn install_path(&self, name: &str) -> Result<Option<String>, BuildDetailsError>;
}
