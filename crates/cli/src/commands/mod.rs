// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod admin;
pub mod daemon;
pub mod lease;
pub mod output;
pub mod session;
pub mod watch;

use anyhow::Result;
use tokio::sync::watch as signal;

/// Abort signal flipped by Ctrl-C; `action` is what the command does next
pub(crate) fn abort_on_ctrlc(action: &'static str) -> Result<signal::Receiver<bool>> {
    let (tx, rx) = signal::channel(false);
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, {}...", action);
        let _ = tx.send(true);
    })?;
    Ok(rx)
}
