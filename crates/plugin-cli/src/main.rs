//! plugman-resolve CLI
//!
//! Resolves plugin targets, selects compatible releases and answers
//! dependency questions for a hybrid-app project.

mod cli;
mod commands;
mod config;
mod error;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use error::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("Verbose mode enabled");

    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Some(cmd) => execute_command(cmd, project_root).await,
        None => {
            println!("{} plugin version resolution", "plugman-resolve".green().bold());
            println!();
            println!("Run {} for available commands.", "plugman-resolve --help".cyan());
            Ok(())
        }
    }
}

async fn execute_command(cmd: Commands, project_root: PathBuf) -> Result<()> {
    match cmd {
        Commands::Resolve {
            targets,
            registry,
            variables,
        } => commands::run_resolve(&project_root, &targets, &registry, &variables).await,
        Commands::Select {
            plugin,
            registry,
            json,
        } => commands::run_select(&project_root, &plugin, &registry, json).await,
        Commands::Check {
            plugin,
            version,
            registry,
        } => commands::run_check(&project_root, &plugin, &version, &registry).await,
        Commands::Dependents { plugin, platform } => {
            commands::run_dependents(&project_root, &plugin, &platform)
        }
        Commands::Danglers { plugin, platform } => {
            commands::run_danglers(&project_root, &plugin, &platform)
        }
    }
}
