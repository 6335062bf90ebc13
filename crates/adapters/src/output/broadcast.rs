// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relays output commands over the liveness channel
//!
//! A device bridge subscribed to the channel picks up `led-command`
//! broadcasts and drives its pins. Delivery is fire-and-forget.

use super::{OutputError, OutputSink};
use crate::liveness::LivenessChannel;
use async_trait::async_trait;
use lg_core::OutputCommand;
use std::time::Duration;

/// Broadcast event name carrying `{"command": "OFF:3"}`
pub const OUTPUT_COMMAND_EVENT: &str = "led-command";

#[derive(Clone)]
pub struct BroadcastOutputSink<L> {
    channel: L,
    timeout: Duration,
}

impl<L: LivenessChannel> BroadcastOutputSink<L> {
    pub fn new(channel: L, timeout: Duration) -> Self {
        Self { channel, timeout }
    }
}

#[async_trait]
impl<L: LivenessChannel> OutputSink for BroadcastOutputSink<L> {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError> {
        let payload = serde_json::json!({ "command": command.to_string() });
        match tokio::time::timeout(
            self.timeout,
            self.channel.broadcast(OUTPUT_COMMAND_EVENT, payload),
        )
        .await
        {
            Ok(result) => result.map_err(OutputError::from),
            Err(_) => Err(OutputError::Timeout(self.timeout)),
        }
    }
}
