use build_details::{
    generate::{self, GenerateArgs},
    logger, GlobalOpts,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "build-details")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Generate build-details.json for a Python installation",
    long_about = "Describes the build, installation layout and ABI of the Python runtime so that \
                  packaging and build tools can locate headers, libraries and the interpreter."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(flatten)]
    args: GenerateArgs,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(
        cli.global.verbosity_level(),
        cli.global.quiet,
        cli.global.log_file.as_deref(),
    ) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    if let Err(e) = generate::handle_generate(cli.args, &cli.global) {
        generate::report_failure(&e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("build_details_core={}", logger::verbosity_to_filter()).into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
