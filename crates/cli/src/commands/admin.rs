// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lg force-release` - operator override

use anyhow::Result;
use clap::Args;
use lg_core::ResourceId;

use super::lease::print_reclaim;
use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ForceReleaseArgs {
    /// Resource to free, whoever holds it
    #[arg(required_unless_present = "all")]
    pub resource: Option<String>,

    /// Free every locked resource
    #[arg(long, conflicts_with = "resource")]
    pub all: bool,
}

pub async fn force_release(
    client: &DaemonClient,
    args: ForceReleaseArgs,
    format: OutputFormat,
) -> Result<()> {
    match args.resource {
        Some(resource) if !args.all => {
            let resource = ResourceId::new(resource);
            let result = client.force_release(&resource).await?;
            print_reclaim(&resource, result, format)
        }
        _ => {
            let released = client.force_release_all().await?;
            output::print_list(&released, format, "Nothing was locked", |s| {
                format!("Released {} ({} outputs off)", s.resource, s.leds_off)
            });
            Ok(())
        }
    }
}
