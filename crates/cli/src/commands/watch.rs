// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lg watch` and `lg bridge` - follow the daemon's channel broadcasts
//!
//! `watch` prints lease updates and LED commands as they happen. `bridge`
//! drives a local line device from the `led-command` broadcasts of a daemon
//! configured with `sink = "broadcast"`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lg_adapters::{LineOutputSink, OutputSink, PinMap, OUTPUT_COMMAND_EVENT};
use lg_core::OutputCommand;
use tokio::sync::watch as signal;

use super::abort_on_ctrlc;
use crate::client::{Broadcast, BroadcastStream, DaemonClient};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct WatchArgs {
    /// Only show broadcasts with this event name
    #[arg(long)]
    pub event: Option<String>,
}

#[derive(Args)]
pub struct BridgeArgs {
    /// Device file to write `<pin>=<level>` lines to
    pub device: PathBuf,

    /// Map an output to a pin label, as `<output>=<pin>`; repeatable
    #[arg(long = "pin", value_parser = parse_pin)]
    pub pins: Vec<(u32, String)>,

    /// Use the stock eight-output bench board pins
    #[arg(long, conflicts_with = "pins")]
    pub bench: bool,
}

pub async fn watch(client: &DaemonClient, args: WatchArgs, format: OutputFormat) -> Result<()> {
    let mut stream = client.subscribe().await?;
    let mut abort = abort_on_ctrlc("stopping")?;
    if matches!(format, OutputFormat::Text) {
        eprintln!("Watching broadcasts (Ctrl-C to stop)");
    }

    while let Some(broadcast) = next_or_abort(&mut stream, &mut abort).await? {
        if args.event.as_deref().is_some_and(|e| e != broadcast.event) {
            continue;
        }
        match format {
            OutputFormat::Text => println!("{} {}", broadcast.event, broadcast.payload),
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(&broadcast) {
                    println!("{}", json);
                }
            }
        }
    }
    Ok(())
}

pub async fn bridge(client: &DaemonClient, args: BridgeArgs) -> Result<()> {
    let pins = if args.bench {
        PinMap::bench_board()
    } else if args.pins.is_empty() {
        PinMap::passthrough()
    } else {
        PinMap::from_pairs(args.pins)
    };
    let sink = LineOutputSink::open(&args.device, pins).await?;
    let mut stream = client.subscribe().await?;
    let mut abort = abort_on_ctrlc("stopping")?;
    eprintln!("Bridging LED commands to {}", args.device.display());

    let applied = relay_commands(&mut stream, &mut abort, &sink).await?;
    tracing::info!(applied, "bridge stopped");
    Ok(())
}

/// Apply each `led-command` broadcast to `sink` until the stream ends or
/// `abort` flips. A failed command is logged and skipped. Returns how many
/// commands landed.
async fn relay_commands(
    stream: &mut BroadcastStream,
    abort: &mut signal::Receiver<bool>,
    sink: &impl OutputSink,
) -> Result<usize> {
    let mut applied = 0;
    while let Some(broadcast) = next_or_abort(stream, abort).await? {
        let Some(command) = led_command(&broadcast) else {
            continue;
        };
        match sink.send(command).await {
            Ok(()) => applied += 1,
            Err(e) => tracing::warn!(%command, error = %e, "bridged command failed"),
        }
    }
    Ok(applied)
}

/// Next broadcast, or `None` once the daemon closes the stream or `abort`
/// flips
async fn next_or_abort(
    stream: &mut BroadcastStream,
    abort: &mut signal::Receiver<bool>,
) -> Result<Option<Broadcast>> {
    tokio::select! {
        next = stream.next() => Ok(next?),
        _ = abort.wait_for(|stop| *stop) => Ok(None),
    }
}

/// The command carried by a `led-command` broadcast
fn led_command(broadcast: &Broadcast) -> Option<OutputCommand> {
    if broadcast.event != OUTPUT_COMMAND_EVENT {
        return None;
    }
    broadcast.payload.get("command")?.as_str()?.parse().ok()
}

fn parse_pin(s: &str) -> Result<(u32, String), String> {
    let (output, pin) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <output>=<pin>, got '{}'", s))?;
    let output = output
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid output number '{}'", output))?;
    let pin = pin.trim();
    if pin.is_empty() {
        return Err(format!("missing pin for output {}", output));
    }
    Ok((output, pin.to_string()))
}
