// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lg run` and `lg hold` - routines that keep a lease bound to this process
//!
//! Both run over one attached connection, so the lease is reclaimed if the
//! process dies. Ctrl-C aborts and unlocks.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use lg_core::ResourceId;
use lg_engine::{run_with_lease, standard_routine, SessionOutcome, Step};

use super::abort_on_ctrlc;
use crate::client::DaemonClient;
use crate::error::LgError;
use crate::output::{self, OutputFormat};

/// Hold time when `lg hold` is given no limit
const HOLD_UNTIL_INTERRUPTED: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Args)]
pub struct RunArgs {
    /// Resource to run the routine on
    pub resource: String,

    /// Pause between phases (milliseconds)
    #[arg(long, default_value = "500")]
    pub pace_ms: u64,

    /// Give up and unlock after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct HoldArgs {
    pub resource: String,

    /// Release after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub seconds: Option<u64>,
}

pub async fn run(client: &DaemonClient, args: RunArgs, format: OutputFormat) -> Result<()> {
    let resource = ResourceId::new(args.resource);
    let outputs = client
        .list()
        .await?
        .into_iter()
        .find(|lease| lease.resource == resource)
        .map(|lease| lease.outputs)
        .ok_or_else(|| LgError::resource_not_found(&resource))?;

    let steps = standard_routine(&outputs, Duration::from_millis(args.pace_ms));
    let deadline = args.timeout.map(Duration::from_secs);
    execute(client, &resource, &steps, deadline, format).await
}

pub async fn hold(client: &DaemonClient, args: HoldArgs, format: OutputFormat) -> Result<()> {
    let resource = ResourceId::new(args.resource);
    let hold_for = args
        .seconds
        .map(Duration::from_secs)
        .unwrap_or(HOLD_UNTIL_INTERRUPTED);

    if format_is_text(format) {
        println!("Holding {} (Ctrl-C to release)", resource);
    }
    execute(client, &resource, &[Step::Pause(hold_for)], None, format).await
}

async fn execute(
    client: &DaemonClient,
    resource: &ResourceId,
    steps: &[Step],
    deadline: Option<Duration>,
    format: OutputFormat,
) -> Result<()> {
    let abort = abort_on_ctrlc("releasing")?;
    let attached = client.attach().await?;

    match run_with_lease(&attached, resource, steps, abort, deadline).await? {
        SessionOutcome::Locked => Err(LgError::resource_in_use(resource).into()),
        SessionOutcome::NotFound => Err(LgError::resource_not_found(resource).into()),
        outcome => {
            output::print(&outcome, format, |o| match o {
                SessionOutcome::Completed { steps } => {
                    format!("Done: {} steps on {}, released", steps, resource)
                }
                SessionOutcome::Aborted { after } => {
                    format!("Aborted after {} steps, released {}", after, resource)
                }
                SessionOutcome::TimedOut { after } => {
                    format!("Timed out after {} steps, released {}", after, resource)
                }
                SessionOutcome::Locked | SessionOutcome::NotFound => String::new(),
            });
            Ok(())
        }
    }
}

fn format_is_text(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Text)
}
