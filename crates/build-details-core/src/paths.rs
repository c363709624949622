//! Rewriting installation paths relative to `base_prefix`

use crate::document::{lookup_section_mut, Section};
use crate::errors::BuildDetailsError;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Fields eligible for relativization, as dotted keys
pub const PATH_FIELDS: [&str; 5] = [
    "interpreter.path",
    "libpython.dynamic",
    "libpython.static",
    "c_api.headers",
    "c_api.pkgconfig_path",
];

/// Rewrite every populated [`PATH_FIELDS`] entry relative to `base_prefix`
///
/// A field whose section was never rendered is skipped, as is a field that
/// is absent or null. Anything else that goes wrong is an error.
pub fn relativize_paths(document: &mut Section) -> Result<(), BuildDetailsError> {
    let base = match document.get("base_prefix") {
        Some(Value::String(base)) => base.clone(),
        other => {
            return Err(BuildDetailsError::introspection(
                "base_prefix",
                format!("expected the installation prefix as a string, found {:?}", other),
            ))
        }
    };

    for entry in PATH_FIELDS {
        let Some((section_key, item)) = entry.rsplit_once('.') else {
            continue;
        };
        let section = match lookup_section_mut(document, section_key) {
            Ok(section) => section,
            Err(BuildDetailsError::MissingSection { .. }) => {
                debug!("Section '{}' not rendered, leaving {} alone", section_key, entry);
                continue;
            }
            Err(e) => return Err(e),
        };

        let relative = match section.get(item) {
            None | Some(Value::Null) => continue,
            Some(Value::String(path)) => relative_path(path, &base)?,
            Some(other) => {
                return Err(BuildDetailsError::introspection(
                    entry,
                    format!("expected a path string, found {}", other),
                ))
            }
        };
        debug!("{} -> {}", entry, relative);
        section.insert(item.to_string(), Value::String(relative));
    }

    Ok(())
}

/// Express `path` relative to `base`, always with a leading `./`
///
/// Both sides are made absolute against the working directory and normalized
/// lexically (no symlink resolution). A path outside `base` climbs out with
/// `..`; `path == base` gives `./.`.
pub fn relative_path(path: &str, base: &str) -> Result<String, BuildDetailsError> {
    let target = normalize(&absolute(path, base)?);
    let anchor = normalize(&absolute(base, base)?);

    let target_parts: Vec<Component<'_>> = target.components().collect();
    let anchor_parts: Vec<Component<'_>> = anchor.components().collect();

    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) =
        (target_parts.first(), anchor_parts.first())
    {
        if a != b {
            return Err(BuildDetailsError::PathRelativization {
                path: path.to_string(),
                base: base.to_string(),
                reason: "paths are on different drives".to_string(),
            });
        }
    }

    let common = target_parts
        .iter()
        .zip(&anchor_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..anchor_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }

    Ok(Path::new(".").join(relative).to_string_lossy().into_owned())
}

fn absolute(path: &str, base: &str) -> Result<PathBuf, BuildDetailsError> {
    let path = Path::new(path);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| BuildDetailsError::PathRelativization {
        path: path.display().to_string(),
        base: base.to_string(),
        reason: format!("cannot resolve working directory: {}", e),
    })?;
    Ok(cwd.join(path))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
