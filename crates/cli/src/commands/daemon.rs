// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lg daemon` - start, stop and inspect the lease daemon

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use lg_daemon::Config;
use serde::Serialize;

use crate::client::{
    daemon_stop, find_lgd_binary, read_daemon_pid, ClientError, DaemonClient, DaemonStatus,
};
use crate::error::LgError;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon if it is not running
    Start {
        /// Run in the foreground instead of detaching
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
    /// Show the daemon log
    Logs {
        /// Number of lines from the end
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

#[derive(Serialize)]
struct StatusView {
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    busy: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    online: Option<usize>,
}

pub async fn handle(args: DaemonArgs, project_root: &Path, format: OutputFormat) -> Result<()> {
    let config = Config::for_project(project_root).map_err(ClientError::from)?;

    match args.command {
        DaemonCommand::Start { foreground: true } => {
            let status = std::process::Command::new(find_lgd_binary())
                .arg(&config.project_root)
                .status()?;
            if !status.success() {
                anyhow::bail!("lgd exited with {}", status);
            }
        }
        DaemonCommand::Start { foreground: false } => {
            DaemonClient::connect_or_start(project_root)
                .await
                .map_err(LgError::daemon_unavailable)?;
            println!("Daemon running");
        }
        DaemonCommand::Stop => {
            if daemon_stop(&config).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }
        DaemonCommand::Status => {
            let view = status_view(&config).await?;
            output::print(&view, format, render_status);
        }
        DaemonCommand::Logs { lines } => {
            let content = match std::fs::read_to_string(&config.log_path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    println!("No log at {}", config.log_path.display());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let all: Vec<&str> = content.lines().collect();
            for line in &all[all.len().saturating_sub(lines)..] {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn status_view(config: &Config) -> Result<StatusView, ClientError> {
    let client = match DaemonClient::connect(config) {
        Ok(client) => client,
        Err(ClientError::DaemonNotRunning) => {
            return Ok(StatusView {
                running: false,
                pid: None,
                version: None,
                uptime_secs: None,
                resources: None,
                busy: None,
                online: None,
            })
        }
        Err(e) => return Err(e),
    };

    let DaemonStatus {
        uptime_secs,
        resources,
        busy,
        online,
    } = client.status().await?;
    Ok(StatusView {
        running: true,
        pid: read_daemon_pid(config),
        version: client.hello().await.ok(),
        uptime_secs: Some(uptime_secs),
        resources: Some(resources),
        busy: Some(busy),
        online: Some(online),
    })
}

fn render_status(view: &StatusView) -> String {
    if !view.running {
        return "Daemon not running".to_string();
    }
    let mut lines = vec!["Daemon running".to_string()];
    if let Some(pid) = view.pid {
        lines.push(format!("  pid:       {}", pid));
    }
    if let Some(version) = &view.version {
        lines.push(format!("  protocol:  {}", version));
    }
    if let Some(uptime) = view.uptime_secs {
        lines.push(format!("  uptime:    {}s", uptime));
    }
    if let (Some(resources), Some(busy)) = (view.resources, view.busy) {
        lines.push(format!("  leases:    {} of {} in use", busy, resources));
    }
    if let Some(online) = view.online {
        lines.push(format!("  online:    {}", online));
    }
    lines.join("\n")
}
