//! Assembling the build-details document from a runtime

use crate::document::{BuildDetails, Section};
use crate::errors::BuildDetailsError;
use crate::output::BuildDetailsOutput;
use crate::paths::relativize_paths;
use crate::runtime::{RuntimeIntrospector, SuffixKind};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Extension suffixes starting with this are stable-ABI variants
pub const STABLE_ABI_MARKER: &str = ".abi";

/// What the caller asks the collector for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Echoed verbatim into `schema_version`
    pub schema_version: String,
    /// Rewrite path fields relative to `base_prefix`
    pub relative_paths: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            schema_version: "1".to_string(),
            relative_paths: false,
        }
    }
}

/// Run [`generate`] inside a diagnostic-capture scope
///
/// Diagnostics the runtime raises while being queried end up in the
/// returned output. The scope is released on every path out of here.
pub fn collect<R: RuntimeIntrospector + ?Sized>(
    runtime: &R,
    options: &GenerateOptions,
) -> Result<BuildDetailsOutput, BuildDetailsError> {
    let capture = runtime.capture_diagnostics()?;
    let data = generate(runtime, options)?;
    let warnings = capture.finish()?;
    if !warnings.is_empty() {
        info!("Captured {} diagnostic(s) during collection", warnings.len());
    }
    Ok(BuildDetailsOutput { data, warnings })
}

/// Build the document in one pass over the runtime's introspection sources
pub fn generate<R: RuntimeIntrospector + ?Sized>(
    runtime: &R,
    options: &GenerateOptions,
) -> Result<BuildDetails, BuildDetailsError> {
    debug!(
        "Generating build details (schema {}, relative paths: {})",
        options.schema_version, options.relative_paths
    );

    let mut data = Section::new();
    data.insert(
        "schema_version".to_string(),
        Value::String(options.schema_version.clone()),
    );
    data.insert("base_prefix".to_string(), runtime.config_var("prefix")?);
    data.insert("platform".to_string(), Value::String(runtime.platform()?));

    let mut language = Section::new();
    language.insert(
        "version".to_string(),
        Value::String(runtime.python_version()?),
    );
    language.insert(
        "version_info".to_string(),
        runtime.version_info()?.to_value(),
    );
    data.insert("language".to_string(), Value::Object(language));

    // `version` keeps its slot in the runtime's attribute order
    let mut implementation = runtime.implementation()?;
    implementation.insert(
        "version".to_string(),
        runtime.implementation_version()?.to_value(),
    );
    data.insert("implementation".to_string(), Value::Object(implementation));

    let mut interpreter = Section::new();
    interpreter.insert(
        "path".to_string(),
        runtime.executable()?.map_or(Value::Null, Value::String),
    );
    data.insert("interpreter".to_string(), Value::Object(interpreter));

    let mut abi = Section::new();
    abi.insert(
        "flags".to_string(),
        Value::Array(
            runtime
                .abiflags()?
                .chars()
                .map(|flag| Value::String(flag.to_string()))
                .collect(),
        ),
    );
    abi.insert(
        "extension_suffix".to_string(),
        runtime.config_var("EXT_SUFFIX")?,
    );
    let extensions = runtime.suffixes(SuffixKind::Extensions)?;
    if let Some(suffix) = stable_abi_suffix(&extensions) {
        abi.insert(
            "stable_abi_suffix".to_string(),
            Value::String(suffix.to_string()),
        );
    }
    data.insert("abi".to_string(), Value::Object(abi));

    let mut suffixes = Section::new();
    for kind in SuffixKind::ALL {
        let list = match kind {
            SuffixKind::Extensions => extensions.clone(),
            other => runtime.suffixes(other)?,
        };
        suffixes.insert(
            kind.key().to_string(),
            Value::Array(list.into_iter().map(Value::String).collect()),
        );
    }
    data.insert("suffixes".to_string(), Value::Object(suffixes));

    let libdir = runtime.config_var("LIBDIR")?;
    let mut libpython = Section::new();
    libpython.insert(
        "dynamic".to_string(),
        library_path(&libdir, runtime.config_var("LDLIBRARY")?, "LDLIBRARY")?,
    );
    libpython.insert(
        "static".to_string(),
        library_path(&libdir, runtime.config_var("LIBRARY")?, "LIBRARY")?,
    );
    libpython.insert(
        "link_to_libpython".to_string(),
        Value::Bool(truthy(&runtime.config_var("LIBPYTHON")?)),
    );
    data.insert("libpython".to_string(), Value::Object(libpython));

    let mut c_api = Section::new();
    c_api.insert(
        "headers".to_string(),
        runtime.install_path("include")?.map_or(Value::Null, Value::String),
    );
    let pkgconfig = match runtime.config_var("LIBPC")? {
        Value::String(path) => Value::String(path),
        _ => Value::Null,
    };
    c_api.insert("pkgconfig_path".to_string(), pkgconfig);
    data.insert("c_api".to_string(), Value::Object(c_api));

    if options.relative_paths {
        relativize_paths(&mut data)?;
    }

    Ok(BuildDetails::from_section(data))
}

/// First extension suffix following the stable-ABI naming convention
pub fn stable_abi_suffix(extensions: &[String]) -> Option<&str> {
    extensions
        .iter()
        .map(String::as_str)
        .find(|suffix| suffix.starts_with(STABLE_ABI_MARKER))
}

/// Truthiness of a configuration value: unset, empty and zero are false
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// `libdir/name` when the library name is set, null otherwise
fn library_path(libdir: &Value, name: Value, var: &str) -> Result<Value, BuildDetailsError> {
    if !truthy(&name) {
        return Ok(Value::Null);
    }
    let Value::String(name) = name else {
        return Err(BuildDetailsError::introspection(
            var,
            format!("expected a library file name, found {}", name),
        ));
    };
    let Value::String(libdir) = libdir else {
        return Err(BuildDetailsError::introspection(
            "LIBDIR",
            format!("{} is set to '{}' but LIBDIR is {}", var, name, libdir),
        ));
    };
    Ok(Value::String(
        Path::new(libdir).join(name).to_string_lossy().into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRuntime;
    use crate::runtime::Warning;
    use serde_json::json;

    fn absolute() -> GenerateOptions {
        GenerateOptions::default()
    }

    fn relative() -> GenerateOptions {
        GenerateOptions {
            relative_paths: true,
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn test_section_order() {
        let runtime = FakeRuntime::linux();
        let Ok(doc) = generate(&runtime, &absolute()) else {
            panic!("generation should succeed");
        };
        let keys: Vec<&str> = doc.as_section().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "schema_version",
                "base_prefix",
                "platform",
                "language",
                "implementation",
                "interpreter",
                "abi",
                "suffixes",
                "libpython",
                "c_api"
            ]
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_absolute_document() {
        let runtime = FakeRuntime::linux();
        let Ok(doc) = generate(&runtime, &absolute()) else {
            panic!("generation should succeed");
        };
        assert_eq!(
            serde_json::to_value(&doc).unwrap_or_default(),
            json!({
                "schema_version": "1",
                "base_prefix": "/usr",
                "platform": "linux-x86_64",
                "language": {
                    "version": "3.12",
                    "version_info": {
                        "major": 3, "minor": 12, "micro": 1,
                        "releaselevel": "final", "serial": 0
                    }
                },
                "implementation": {
                    "name": "cpython",
                    "cache_tag": "cpython-312",
                    "version": {
                        "major": 3, "minor": 12, "micro": 1,
                        "releaselevel": "final", "serial": 0
                    },
                    "hexversion": 51118576,
                    "_multiarch": "x86_64-linux-gnu"
                },
                "interpreter": { "path": "/usr/bin/python3.12" },
                "abi": {
                    "flags": [],
                    "extension_suffix": ".cpython-312-x86_64-linux-gnu.so",
                    "stable_abi_suffix": ".abi3.so"
                },
                "suffixes": {
                    "source": [".py"],
                    "bytecode": [".pyc"],
                    "optimized_bytecode": [".pyc"],
                    "debug_bytecode": [".pyc"],
                    "extensions": [".cpython-312-x86_64-linux-gnu.so", ".abi3.so", ".so"]
                },
                "libpython": {
                    "dynamic": "/usr/lib/x86_64-linux-gnu/libpython3.12.so",
                    "static": "/usr/lib/x86_64-linux-gnu/libpython3.12.a",
                    "link_to_libpython": true
                },
                "c_api": {
                    "headers": "/usr/include/python3.12",
                    "pkgconfig_path": "/usr/lib/x86_64-linux-gnu/pkgconfig"
                }
            })
        );
    }

    #[test]
    fn test_implementation_attribute_order_survives_normalization() {
        let runtime = FakeRuntime::linux();
        let Ok(doc) = generate(&runtime, &absolute()) else {
            panic!("generation should succeed");
        };
        let Ok(Some(Value::Object(implementation))) = doc.get("implementation") else {
            panic!("implementation section missing");
        };
        let keys: Vec<&str> = implementation.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "cache_tag", "version", "hexversion", "_multiarch"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_relative_document_paths() {
        let runtime = FakeRuntime::linux();
        let Ok(doc) = generate(&runtime, &relative()) else {
            panic!("generation should succeed");
        };
        assert_eq!(doc.get_str("base_prefix"), Some("/usr"));
        assert_eq!(doc.get_str("interpreter.path"), Some("./bin/python3.12"));
        assert_eq!(
            doc.get_str("libpython.dynamic"),
            Some("./lib/x86_64-linux-gnu/libpython3.12.so")
        );
        assert_eq!(
            doc.get_str("libpython.static"),
            Some("./lib/x86_64-linux-gnu/libpython3.12.a")
        );
        assert_eq!(doc.get_str("c_api.headers"), Some("./include/python3.12"));
        assert_eq!(
            doc.get_str("c_api.pkgconfig_path"),
            Some("./lib/x86_64-linux-gnu/pkgconfig")
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_relative_paths_round_trip_to_absolute() {
        let runtime = FakeRuntime::linux();
        let (Ok(abs), Ok(rel)) = (
            generate(&runtime, &absolute()),
            generate(&runtime, &relative()),
        ) else {
            panic!("generation should succeed");
        };
        let base = Path::new("/usr");
        for field in crate::paths::PATH_FIELDS {
            let (Some(abs_path), Some(rel_path)) = (abs.get_str(field), rel.get_str(field)) else {
                panic!("{} should be populated", field);
            };
            let rejoined: std::path::PathBuf = base
                .join(rel_path)
                .components()
                .filter(|c| !matches!(c, std::path::Component::CurDir))
                .collect();
            assert_eq!(rejoined, Path::new(abs_path), "{}", field);
        }
    }

    #[test]
    fn test_absent_dynamic_library_stays_null() {
        let runtime = FakeRuntime::linux()
            .with_config_var("LDLIBRARY", json!(""))
            .with_config_var("LIBPC", Value::Null);
        for options in [absolute(), relative()] {
            let Ok(doc) = generate(&runtime, &options) else {
                panic!("generation should succeed");
            };
            assert!(matches!(doc.get("libpython.dynamic"), Ok(Some(Value::Null))));
            assert!(matches!(doc.get("c_api.pkgconfig_path"), Ok(Some(Value::Null))));
        }
    }

    #[test]
    fn test_library_name_without_libdir_is_an_error() {
        let runtime = FakeRuntime::linux().with_config_var("LIBDIR", Value::Null);
        let result = generate(&runtime, &absolute());
        assert!(matches!(
            result,
            Err(BuildDetailsError::Introspection { ref query, .. }) if query == "LIBDIR"
        ));
    }

    #[test]
    fn test_link_to_libpython_follows_truthiness() {
        for (value, expected) in [
            (json!("-lpython3.12"), true),
            (json!(""), false),
            (Value::Null, false),
            (json!(0), false),
        ] {
            let runtime = FakeRuntime::linux().with_config_var("LIBPYTHON", value);
            let Ok(doc) = generate(&runtime, &absolute()) else {
                panic!("generation should succeed");
            };
            assert!(matches!(
                doc.get("libpython.link_to_libpython"),
                Ok(Some(Value::Bool(b))) if *b == expected
            ));
        }
    }

    #[test]
    fn test_stable_abi_suffix_first_match() {
        let extensions = vec![
            ".cpython-312-x86_64.so".to_string(),
            ".abi3.so".to_string(),
            ".so".to_string(),
        ];
        assert_eq!(stable_abi_suffix(&extensions), Some(".abi3.so"));

        let two = vec![".abi3.so".to_string(), ".abi4.so".to_string()];
        assert_eq!(stable_abi_suffix(&two), Some(".abi3.so"));
    }

    #[test]
    fn test_stable_abi_suffix_key_omitted_without_match() {
        let runtime = FakeRuntime::linux().with_suffixes(
            SuffixKind::Extensions,
            &[".cpython-312-x86_64-linux-gnu.so", ".so"],
        );
        let Ok(doc) = generate(&runtime, &absolute()) else {
            panic!("generation should succeed");
        };
        assert!(matches!(doc.get("abi.stable_abi_suffix"), Ok(None)));
    }

    #[test]
    fn test_abi_flags_are_split() {
        let runtime = FakeRuntime::linux().with_abiflags("td");
        let Ok(doc) = generate(&runtime, &absolute()) else {
            panic!("generation should succeed");
        };
        assert!(matches!(doc.get("abi.flags"), Ok(Some(v)) if *v == json!(["t", "d"])));
    }

    #[test]
    fn test_schema_version_passes_through() {
        let runtime = FakeRuntime::linux();
        let options = GenerateOptions {
            schema_version: "2".to_string(),
            relative_paths: false,
        };
        let Ok(doc) = generate(&runtime, &options) else {
            panic!("generation should succeed");
        };
        assert_eq!(doc.get_str("schema_version"), Some("2"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let runtime = FakeRuntime::linux();
        for options in [absolute(), relative()] {
            let first = collect(&runtime, &options).and_then(|o| o.to_json());
            let second = collect(&runtime, &options).and_then(|o| o.to_json());
            assert!(first.is_ok());
            assert_eq!(first.ok(), second.ok());
        }
    }

    #[test]
    fn test_no_diagnostics_gives_empty_list() {
        let runtime = FakeRuntime::linux();
        let Ok(output) = collect(&runtime, &absolute()) else {
            panic!("collection should succeed");
        };
        assert!(output.warnings.is_empty());
        let rendered = output.to_json().unwrap_or_default();
        assert!(rendered.ends_with("\"warnings\": []\n}"));
    }

    #[test]
    fn test_single_diagnostic_is_captured() {
        let warning = Warning::new(
            "importlib.machinery.DEBUG_BYTECODE_SUFFIXES is deprecated",
            "builtins",
            "DeprecationWarning",
            "<frozen importlib._bootstrap_external>",
            42,
        );
        let runtime = FakeRuntime::linux().warn_on("DEBUG_BYTECODE_SUFFIXES", warning.clone());

        let Ok(output) = collect(&runtime, &absolute()) else {
            panic!("collection should succeed");
        };
        assert_eq!(output.warnings, vec![warning]);
        assert!(runtime.reported().is_empty());
        assert!(!runtime.is_capturing());
    }

    #[test]
    fn test_abi_diagnostics_keep_query_order() {
        let flags = Warning::new("flags", "builtins", "UserWarning", "abi.py", 1);
        let ext_suffix = Warning::new("ext", "builtins", "UserWarning", "abi.py", 2);
        let extensions = Warning::new("suffixes", "builtins", "DeprecationWarning", "abi.py", 3);
        let runtime = FakeRuntime::linux()
            .warn_on("EXTENSION_SUFFIXES", extensions.clone())
            .warn_on("EXT_SUFFIX", ext_suffix.clone())
            .warn_on("abiflags", flags.clone());

        let Ok(output) = collect(&runtime, &absolute()) else {
            panic!("collection should succeed");
        };
        assert_eq!(output.warnings, vec![flags, ext_suffix, extensions]);
    }

    #[test]
    fn test_capture_released_when_collection_fails() {
        let warning = Warning::new("early", "builtins", "UserWarning", "site.py", 3);
        let runtime = FakeRuntime::linux()
            .warn_on("prefix", warning.clone())
            .fail_on("platform");

        let result = collect(&runtime, &absolute());
        assert!(matches!(
            result,
            Err(BuildDetailsError::Introspection { ref query, .. }) if query == "platform"
        ));
        assert!(!runtime.is_capturing());

        // diagnostics after the failed pass are reported normally again
        let _ = runtime.config_var("prefix");
        assert_eq!(runtime.reported(), vec![warning]);
    }
}
