// Copyright 2026 Feedharvest Contributors
// SPDX-License-Identifier: Apache-2.0

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use feedharvest_runtime::cli;
use feedharvest_runtime::cli::run_cmd::RunArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "feedharvest",
    about = "Feedharvest: collect search results from a social feed into CSV",
    version,
    after_help = "Run 'feedharvest <command> --help' for details on each command.\nRun 'feedharvest' with no command to start a harvest."
)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, search, and harvest posts into a CSV file
    Run(RunArgs),
    /// Check environment and diagnose issues
    Doctor {
        /// Path to the Chromium/Chrome binary
        #[arg(long)]
        chromium_path: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        cli.log_level.as_str()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        // No subcommand → harvest with defaults and prompts
        None => cli::run_cmd::run(RunArgs::default(), cli.quiet).await,
        Some(Commands::Run(args)) => cli::run_cmd::run(args, cli.quiet).await,
        Some(Commands::Doctor { chromium_path }) => cli::doctor::run(chromium_path).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "feedharvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
