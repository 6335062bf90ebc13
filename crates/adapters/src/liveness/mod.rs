// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness channel: presence tracking plus fire-and-forget broadcast
//!
//! Each connection tracks one presence entry. When the connection goes away
//! the channel emits a leave event carrying the entry's last payload.

mod memory;

pub use memory::MemoryChannel;

use async_trait::async_trait;
use lg_core::{ConnectionKey, PresencePayload};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel name presence entries are tracked under
pub const PRESENCE_CHANNEL: &str = "led-group-presence";

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("channel call {op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("channel closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    /// Full presence snapshot size, sent when a subscription opens
    Sync { online: usize },
    Join {
        key: ConnectionKey,
        payload: PresencePayload,
    },
    /// `left` holds the payloads the departed entry last carried
    Leave {
        key: ConnectionKey,
        left: Vec<PresencePayload>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Presence(PresenceEvent),
    Broadcast {
        event: String,
        payload: serde_json::Value,
    },
}

pub type ChannelReceiver = mpsc::UnboundedReceiver<ChannelEvent>;

#[async_trait]
pub trait LivenessChannel: Clone + Send + Sync + 'static {
    /// Open a subscription under `subscriber`; the first event is a sync
    async fn subscribe(&self, subscriber: &str) -> Result<ChannelReceiver, ChannelError>;

    /// Tear down a subscription, complete or partial. Idempotent.
    async fn unsubscribe(&self, subscriber: &str) -> Result<(), ChannelError>;

    /// Join with `payload`, or replace the payload of an existing entry
    async fn track(&self, key: &ConnectionKey, payload: PresencePayload)
        -> Result<(), ChannelError>;

    /// Remove the entry, emitting a leave event if it existed
    async fn untrack(&self, key: &ConnectionKey) -> Result<(), ChannelError>;

    async fn broadcast(&self, event: &str, payload: serde_json::Value)
        -> Result<(), ChannelError>;

    async fn presence(&self) -> Result<Vec<(ConnectionKey, PresencePayload)>, ChannelError>;
}

/// Subscribe within `timeout`, tearing the partial subscription down on expiry
pub async fn subscribe_bounded<L: LivenessChannel>(
    channel: &L,
    subscriber: &str,
    timeout: Duration,
) -> Result<ChannelReceiver, ChannelError> {
    match tokio::time::timeout(timeout, channel.subscribe(subscriber)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(subscriber, ?timeout, "subscribe timed out, removing channel");
            channel.unsubscribe(subscriber).await?;
            Err(ChannelError::Timeout {
                op: "subscribe",
                after: timeout,
            })
        }
    }
}
