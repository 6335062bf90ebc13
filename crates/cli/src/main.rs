// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lg - exclusive leases on LED groups

mod client;
mod commands;
mod completions;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{admin, daemon, lease, session, watch};
use std::path::PathBuf;

use crate::client::{find_project_root, DaemonClient};
use crate::completions::{generate_completions, CompletionsArgs};
use crate::error::LgError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "lg", version, about = "Exclusive leases on LED groups")]
struct Cli {
    /// Project root directory (where lg.toml lives)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock a resource and print its holder token
    Acquire(lease::AcquireArgs),
    /// Release a resource, whoever holds it
    Release(lease::ReleaseArgs),
    /// Switch a resource's outputs off and release it, if the token still holds it
    Unlock(lease::UnlockArgs),
    /// Show lease state for one or all resources
    Status(lease::StatusArgs),
    /// Lock a resource for as long as this process runs
    Hold(session::HoldArgs),
    /// Run the output routine on a resource under a lease
    Run(session::RunArgs),
    /// Send an ON/OFF command to the output device
    Output(commands::output::OutputArgs),
    /// List output names from lg.toml
    Outputs,
    /// Print lease updates and LED commands as the daemon broadcasts them
    Watch(watch::WatchArgs),
    /// Drive a local line device from the daemon's LED command broadcasts
    Bridge(watch::BridgeArgs),
    /// Operator override: free a resource regardless of holder
    ForceRelease(admin::ForceReleaseArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run(Cli::parse()).await {
        match e.downcast_ref::<LgError>() {
            Some(err) => eprint!("{}", err),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        project,
        output: format,
        command,
    } = cli;

    // Commands that don't need the daemon
    let command = match command {
        Commands::Completions(args) => {
            generate_completions::<Cli>(args.shell);
            return Ok(());
        }
        Commands::Daemon(args) => {
            let project_root = project.map_or_else(find_project_root, Ok)?;
            return daemon::handle(args, &project_root, format).await;
        }
        other => other,
    };

    let project_root = project.map_or_else(find_project_root, Ok)?;
    let client = DaemonClient::connect_or_start(&project_root)
        .await
        .map_err(LgError::daemon_unavailable)?;

    match command {
        Commands::Acquire(args) => lease::acquire(&client, args, format).await,
        Commands::Release(args) => lease::release(&client, args, format).await,
        Commands::Unlock(args) => lease::unlock(&client, args, format).await,
        Commands::Status(args) => lease::status(&client, args, format).await,
        Commands::Hold(args) => session::hold(&client, args, format).await,
        Commands::Run(args) => session::run(&client, args, format).await,
        Commands::Output(args) => commands::output::send(&client, args).await,
        Commands::Outputs => commands::output::list(&client, format).await,
        Commands::Watch(args) => watch::watch(&client, args, format).await,
        Commands::Bridge(args) => watch::bridge(&client, args).await,
        Commands::ForceRelease(args) => admin::force_release(&client, args, format).await,
        // Handled above
        Commands::Daemon(_) | Commands::Completions(_) => Ok(()),
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
