use std::process::ExitCode;

use clap::Parser;
use gitsql::cli::{execute, Args};
use gitsql::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Plans can be validated without any repositories configured
    let config = if args.command.needs_dataset() || args.config.exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(repositories = config.repositories.len(), "starting");
    execute(args.command, &config)
}
