//! The generate command: resolve settings, collect, emit

use crate::common::GlobalOpts;
use crate::errors::CliError;
use build_details_config::Config;
use build_details_core::{ErrorPayload, GenerateOptions};
use build_details_logger as logger;
use build_details_python::Bridge;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Schema version of the build-details.json file to generate [default: 1]
    #[arg(long, value_name = "VERSION")]
    pub schema_version: Option<String>,

    /// Specify paths relative to base_prefix instead of as absolute paths
    #[arg(long)]
    pub relative_paths: bool,

    /// Keep absolute paths even if the config enables relative ones
    #[arg(long, conflicts_with = "relative_paths")]
    pub absolute_paths: bool,

    /// Write the document to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Describe the installation this virtual environment was created from
    #[arg(long, value_name = "DIR", conflicts_with = "python_home")]
    pub venv: Option<PathBuf>,

    /// Describe the installation rooted at DIR (sets PYTHONHOME)
    #[arg(long, value_name = "DIR")]
    pub python_home: Option<PathBuf>,

    /// Configuration file to read instead of the default
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl GenerateArgs {
    /// Command-line values in config form, for merging over the file
    fn as_overrides(&self, global: &GlobalOpts) -> Config {
        let path_string = |p: &PathBuf| p.to_string_lossy().into_owned();
        Config {
            schema_version: self.schema_version.clone(),
            relative_paths: match (self.relative_paths, self.absolute_paths) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            },
            venv_path: self.venv.as_ref().map(path_string),
            python_home: self.python_home.as_ref().map(path_string),
            log_file: global.log_file.as_ref().map(path_string),
        }
    }
}

/// Load the config file and apply command-line overrides
pub fn resolve_config(args: &GenerateArgs, global: &GlobalOpts) -> Result<Config, CliError> {
    let file = match args.config {
        Some(ref path) => {
            logger::debug(&format!("Loading config from {}", path.display()));
            Config::load_from(path)?
        }
        None => Config::load()?,
    };
    Ok(file.merge(args.as_overrides(global)))
}

pub fn handle_generate(args: GenerateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = resolve_config(&args, global)?;

    if global.log_file.is_none() {
        if let Some(ref log_file) = config.log_file {
            if let Err(e) = logger::init_with_verbosity(
                global.verbosity_level(),
                global.quiet,
                Some(Path::new(log_file)),
            ) {
                logger::warn(&format!("Failed to open log file: {}", e));
            }
        }
    }

    let options = GenerateOptions {
        schema_version: config.get_schema_version(),
        relative_paths: config.get_relative_paths(),
    };

    logger::step("Starting embedded interpreter");
    let python_home = config.resolve_python_home()?;
    if let Some(ref home) = python_home {
        logger::info(&format!("Describing Python installation at {}", home.display()));
    }
    let bridge = Bridge::get(python_home.as_deref())?;

    logger::step("Collecting build details");
    let output = bridge.collect(&options)?;
    for warning in &output.warnings {
        logger::debug(&format!(
            "Captured {} at {}:{}: {}",
            warning.category, warning.filename, warning.lineno, warning.message
        ));
    }
    let json = output.to_json()?;

    match args.output {
        Some(path) => {
            fs::write(&path, format!("{}\n", json)).map_err(|source| CliError::Output {
                path: path.clone(),
                source,
            })?;
            logger::info(&format!("Wrote {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Report a failed run: error chain and traceback on stderr, payload on stdout
pub fn report_failure(err: &CliError) {
    logger::error(&err.to_string());
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        logger::error(&format!("  caused by: {}", cause));
        source = cause.source();
    }
    if let Some(trace) = err.trace() {
        logger::trace_block("PYTHON", trace);
    }
    if let Some(log_path) = logger::get_log_path() {
        logger::info(&format!("Full log written to {}", log_path.display()));
    }
    println!("{}", ErrorPayload::new(err.kind(), err.to_string()).render());
}
