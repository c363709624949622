//! The build-details document and dotted-key access into it

use crate::errors::BuildDetailsError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested ordered mapping; keys keep the order they were inserted in
pub type Section = Map<String, Value>;

/// A finished build-details document
///
/// Only read access is exposed; the collector is the one place that builds
/// and rewrites the underlying mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BuildDetails(Section);

impl BuildDetails {
    pub(crate) fn from_section(section: Section) -> Self {
        BuildDetails(section)
    }

    /// Resolve a dotted key such as `"libpython.dynamic"`
    ///
    /// Returns `Ok(None)` when the final field is absent, and an error when an
    /// intermediate section is.
    pub fn get(&self, dotted_key: &str) -> Result<Option<&Value>, BuildDetailsError> {
        match dotted_key.rsplit_once('.') {
            Some((section, item)) => Ok(lookup_section(&self.0, section)?.get(item)),
            None => Ok(self.0.get(dotted_key)),
        }
    }

    /// String value at a dotted key, `None` when absent, null or not a string
    pub fn get_str(&self, dotted_key: &str) -> Option<&str> {
        self.get(dotted_key).ok().flatten().and_then(Value::as_str)
    }

    pub fn as_section(&self) -> &Section {
        &self.0
    }
}

/// The five-component version shape shared by `language` and `implementation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub releaselevel: String,
    pub serial: u64,
}

impl VersionInfo {
    pub fn to_value(&self) -> Value {
        let mut section = Section::new();
        section.insert("major".to_string(), Value::from(self.major));
        section.insert("minor".to_string(), Value::from(self.minor));
        section.insert("micro".to_string(), Value::from(self.micro));
        section.insert(
            "releaselevel".to_string(),
            Value::from(self.releaselevel.clone()),
        );
        section.insert("serial".to_string(), Value::from(self.serial));
        Value::Object(section)
    }
}

/// Descend `root` one segment at a time and return the mapping at `dotted_key`
pub fn lookup_section<'a>(
    root: &'a Section,
    dotted_key: &str,
) -> Result<&'a Section, BuildDetailsError> {
    let mut current = root;
    for segment in dotted_key.split('.') {
        current = match current.get(segment) {
            Some(Value::Object(next)) => next,
            Some(_) => return Err(section_shape(dotted_key, segment)),
            None => return Err(missing_section(dotted_key, segment)),
        };
    }
    Ok(current)
}

/// Mutable counterpart of [`lookup_section`]
pub fn lookup_section_mut<'a>(
    root: &'a mut Section,
    dotted_key: &str,
) -> Result<&'a mut Section, BuildDetailsError> {
    let mut current = root;
    for segment in dotted_key.split('.') {
        current = match current.get_mut(segment) {
            Some(Value::Object(next)) => next,
            Some(_) => return Err(section_shape(dotted_key, segment)),
            None => return Err(missing_section(dotted_key, segment)),
        };
    }
    Ok(current)
}

fn missing_section(key: &str, segment: &str) -> BuildDetailsError {
    BuildDetailsError::MissingSection {
        key: key.to_string(),
        segment: segment.to_string(),
    }
}

fn section_shape(key: &str, segment: &str) -> BuildDetailsError {
    BuildDetailsError::SectionShape {
        key: key.to_string(),
        segment: segment.to_string(),
    }
}
