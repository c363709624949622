use thiserror::Error;

/// Errors that can occur while generating a build-details document
#[derive(Error, Debug)]
pub enum BuildDetailsError {
    /// An intermediate segment of a dotted key is absent
    #[error("Section '{segment}' missing while resolving '{key}'")]
    MissingSection { key: String, segment: String },

    /// An intermediate segment of a dotted key exists but is not a mapping
    #[error("Section '{segment}' of '{key}' is not a mapping")]
    SectionShape { key: String, segment: String },

    /// A query against the runtime failed or returned something unexpected
    #[error("Runtime introspection failed for {query}: {message}")]
    Introspection {
        query: String,
        message: String,
        /// `module.qualname` of the underlying exception, when there is one
        source_kind: Option<String>,
        /// Formatted traceback of the underlying exception, when there is one
        trace: Option<String>,
    },

    #[error("Failed to serialize document: {0}")]
    Serialization(String),

    #[error("Cannot express '{path}' relative to '{base}': {reason}")]
    PathRelativization {
        path: String,
        base: String,
        reason: String,
    },
}

impl BuildDetailsError {
    /// Shorthand for an introspection failure with no underlying exception
    pub fn introspection(query: impl Into<String>, message: impl Into<String>) -> Self {
        BuildDetailsError::Introspection {
            query: query.into(),
            message: message.into(),
            source_kind: None,
            trace: None,
        }
    }

    /// Name reported as `error.kind` in the failure payload
    pub fn kind(&self) -> &'static str {
        match self {
            BuildDetailsError::MissingSection { .. } => "MissingSectionError",
            BuildDetailsError::SectionShape { .. } => "SectionShapeError",
            BuildDetailsError::Introspection { .. } => "EnvironmentIntrospectionError",
            BuildDetailsError::Serialization(_) => "SerializationError",
            BuildDetailsError::PathRelativization { .. } => "PathRelativizationError",
        }
    }

    /// Traceback captured from the runtime, if the failure came from one
    pub fn trace(&self) -> Option<&str> {
        match self {
            BuildDetailsError::Introspection { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BuildDetailsError {
    fn from(err: serde_json::Error) -> Self {
        BuildDetailsError::Serialization(err.to_string())
    }
}
