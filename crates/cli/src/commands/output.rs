// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lg output ON:<n>` - send one command to the output device, and
//! `lg outputs` - list output display names

use anyhow::Result;
use clap::Args;
use lg_core::OutputCommand;

use crate::client::{ClientError, DaemonClient};
use crate::error::LgError;
use crate::output::{print_list, OutputFormat};

#[derive(Args)]
pub struct OutputArgs {
    /// Command in `ON:<output>` or `OFF:<output>` form
    pub command: OutputCommand,
}

pub async fn send(client: &DaemonClient, args: OutputArgs) -> Result<()> {
    match client.send_output(args.command).await {
        Ok(()) => {
            println!("Sent {}", args.command);
            Ok(())
        }
        Err(ClientError::Rejected(message)) => Err(LgError::output_failed(message).into()),
        Err(e) => Err(e.into()),
    }
}

pub async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let outputs = client.outputs().await?;
    print_list(&outputs, format, "No outputs described in lg.toml", |meta| {
        if meta.description.is_empty() {
            format!("{:>3}  {}", meta.id.0, meta.title)
        } else {
            format!("{:>3}  {} - {}", meta.id.0, meta.title, meta.description)
        }
    });
    Ok(())
}
