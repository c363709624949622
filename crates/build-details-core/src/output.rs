//! The emitted envelopes: the success document and the failure payload

use crate::document::BuildDetails;
use crate::errors::BuildDetailsError;
use crate::runtime::Warning;
use serde::Serialize;

/// `{"data": ..., "warnings": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct BuildDetailsOutput {
    pub data: BuildDetails,
    pub warnings: Vec<Warning>,
}

impl BuildDetailsOutput {
    /// Pretty-printed with two-space indentation
    pub fn to_json(&self) -> Result<String, BuildDetailsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
}

/// `{"error": {"kind": ..., "message": ...}}`, emitted when generation fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: ErrorReport,
}

impl ErrorPayload {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorPayload {
            error: ErrorReport {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }

    /// Payload text; never fails, so it is safe on the error path
    pub fn render(&self) -> String {
        let value = serde_json::json!({
            "error": {
                "kind": self.error.kind,
                "message": self.error.message,
            }
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

impl From<&BuildDetailsError> for ErrorPayload {
    fn from(err: &BuildDetailsError) -> Self {
        ErrorPayload::new(err.kind(), err.to_string())
    }
}
