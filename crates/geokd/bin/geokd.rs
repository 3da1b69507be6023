//! geokd binary entry point.
//!
//! Thin wrapper around the geokd library that initializes logging, parses
//! command-line arguments and runs the selected subcommand.

use anyhow::Result;
use clap::Parser;
use geokd::cli::{Cli, run};

fn main() -> Result<()> {
    // Logs go to stderr so that command output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("Running {:?}", cli.command);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}
