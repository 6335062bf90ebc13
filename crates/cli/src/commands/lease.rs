// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lg acquire|release|unlock|status` - one-shot lease operations

use anyhow::Result;
use clap::Args;
use lg_core::{HolderToken, LeaseSnapshot, ResourceId};
use lg_daemon::LeaseSummary;
use lg_engine::AcquireOutcome;
use serde::Serialize;

use crate::client::{DaemonClient, ReclaimResult};
use crate::error::LgError;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct AcquireArgs {
    /// Resource to lock (e.g., "G1")
    pub resource: String,
}

#[derive(Args)]
pub struct ReleaseArgs {
    pub resource: String,
}

#[derive(Args)]
pub struct UnlockArgs {
    pub resource: String,
    /// Holder token returned by `lg acquire`
    pub token: String,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Show a single resource instead of all of them
    pub resource: Option<String>,
}

#[derive(Serialize)]
struct Acquired {
    resource: ResourceId,
    token: HolderToken,
}

#[derive(Serialize)]
struct Released {
    resource: ResourceId,
    locked: bool,
}

pub async fn acquire(client: &DaemonClient, args: AcquireArgs, format: OutputFormat) -> Result<()> {
    let resource = ResourceId::new(args.resource);
    match client.acquire(&resource).await? {
        AcquireOutcome::Acquired { token } => {
            output::print(&Acquired { resource, token }, format, |a| {
                format!(
                    "Acquired {}\n  token: {}\n  No connection is bound to this lease; it is reclaimed \
                     after the sweep grace period. Use `lg hold` to keep it.",
                    a.resource, a.token
                )
            });
            Ok(())
        }
        AcquireOutcome::Locked => Err(LgError::resource_in_use(&resource).into()),
        AcquireOutcome::NotFound => Err(LgError::resource_not_found(&resource).into()),
    }
}

pub async fn release(client: &DaemonClient, args: ReleaseArgs, format: OutputFormat) -> Result<()> {
    let resource = ResourceId::new(args.resource);
    if !client.release(&resource).await? {
        return Err(LgError::resource_not_found(&resource).into());
    }
    output::print(
        &Released {
            resource,
            locked: false,
        },
        format,
        |r| format!("Released {}", r.resource),
    );
    Ok(())
}

pub async fn unlock(client: &DaemonClient, args: UnlockArgs, format: OutputFormat) -> Result<()> {
    let resource = ResourceId::new(args.resource);
    let token = HolderToken::new(args.token);
    let result = client.unlock(&resource, &token).await?;
    print_reclaim(&resource, result, format)
}

/// Report an unlock or forced release
pub fn print_reclaim(resource: &ResourceId, result: ReclaimResult, format: OutputFormat) -> Result<()> {
    match result {
        ReclaimResult::Reclaimed(summary) => {
            output::print(&summary, format, |s| {
                let mut text = format!("Released {} ({} outputs off)", s.resource, s.leds_off);
                if !s.failed.is_empty() {
                    let failed: Vec<String> = s.failed.iter().map(|o| o.to_string()).collect();
                    text.push_str(&format!("\n  failed to switch off: {}", failed.join(", ")));
                }
                text
            });
            Ok(())
        }
        ReclaimResult::Stale => {
            println!("{} is no longer held under that token", resource);
            Ok(())
        }
        ReclaimResult::NotLocked => {
            println!("{} is not locked", resource);
            Ok(())
        }
        ReclaimResult::NotFound => Err(LgError::resource_not_found(resource).into()),
    }
}

pub async fn status(client: &DaemonClient, args: StatusArgs, format: OutputFormat) -> Result<()> {
    match args.resource {
        Some(resource) => {
            let lease = client.query(&ResourceId::new(resource)).await?;
            output::print(&lease, format, render_snapshot);
        }
        None => {
            let leases = client.list().await?;
            output::print_list(&leases, format, "No resources", render_summary);
        }
    }
    Ok(())
}

fn state_label(busy: bool) -> &'static str {
    if busy {
        "in use"
    } else {
        "free"
    }
}

fn render_snapshot(lease: &LeaseSnapshot) -> String {
    format!("{}: {}", lease.resource, state_label(lease.busy))
}

fn render_summary(lease: &LeaseSummary) -> String {
    let outputs: Vec<String> = lease.outputs.iter().map(|o| o.to_string()).collect();
    format!(
        "{:<10} {:<20} {:<12} {}",
        lease.resource.as_str(),
        truncate(&lease.title, 20),
        outputs.join(","),
        state_label(lease.busy)
    )
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
