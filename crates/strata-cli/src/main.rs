//! Strata Command-Line Tool
//!
//! Plans and runs schema migrations for the components described by a
//! JSON manifest, keeping installed versions in a local sled store.

mod commands;
mod config;
mod error;
mod executor;
mod formatter;

use clap::Parser;
use config::Args;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Initialize tracing; stdout is reserved for command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (config, command) = args.into_config();

    tracing::debug!(
        data_path = %config.data_path.display(),
        manifest = %config.manifest.display(),
        format = %config.format,
        "configuration loaded"
    );

    let formatter = formatter::create_formatter(config.format);
    let output = commands::execute(&config, command, &*formatter)?;
    println!("{}", output);
    Ok(())
}
