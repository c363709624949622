//! Build-details document generation
//!
//! Assembles the build-details document (installation layout, ABI and
//! library locations of a Python runtime) from any [`RuntimeIntrospector`],
//! optionally rewriting installation paths relative to `base_prefix`, and
//! renders it as pretty-printed JSON.

pub mod collector;
pub mod document;
pub mod errors;
pub mod output;
pub mod paths;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use collector::{collect, generate, GenerateOptions};
pub use document::{BuildDetails, Section, VersionInfo};
pub use errors::BuildDetailsError;
pub use output::{BuildDetailsOutput, ErrorPayload};
pub use runtime::{DiagnosticCapture, RuntimeIntrospector, SuffixKind, Warning};
