// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output sinks: where ON/OFF commands go

mod broadcast;
mod line;
mod noop;

pub use broadcast::{BroadcastOutputSink, OUTPUT_COMMAND_EVENT};
pub use line::{LineOutputSink, PinMap};
pub use noop::NoOpOutputSink;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeOutputSink;

use crate::liveness::ChannelError;
use async_trait::async_trait;
use lg_core::{OutputCommand, OutputId};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum OutputError {
    #[error("no device pin for output {0}")]
    UnknownOutput(OutputId),
    #[error("device write failed: {0}")]
    Device(String),
    #[error("output command timed out after {0:?}")]
    Timeout(Duration),
    #[error("relay failed: {0}")]
    Relay(#[from] ChannelError),
}

/// Sets one output to a level. Best effort; commands are idempotent.
#[async_trait]
pub trait OutputSink: Clone + Send + Sync + 'static {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError>;
}
