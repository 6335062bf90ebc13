// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lease client for a single-process device bridge

use crate::error::LeaseError;
use crate::manager::AcquireOutcome;
use crate::reclaim::{ReclaimOutcome, Reclaimer};
use crate::session::LeaseClient;
use async_trait::async_trait;
use lg_adapters::{LivenessChannel, OutputSink, RecordStore};
use lg_core::{
    ConnectionKey, HolderToken, OutputCommand, PresencePayload, ReclaimReason, ResourceId,
    TokenGen,
};

/// Drives the engine directly, tracking presence under its own key
#[derive(Clone)]
pub struct LocalLeaseClient<S, O, L, T> {
    reclaimer: Reclaimer<S, O, T>,
    channel: L,
    key: ConnectionKey,
}

impl<S, O, L, T> LocalLeaseClient<S, O, L, T>
where
    S: RecordStore,
    O: OutputSink,
    L: LivenessChannel,
    T: TokenGen,
{
    pub fn new(reclaimer: Reclaimer<S, O, T>, channel: L, key: ConnectionKey) -> Self {
        Self {
            reclaimer,
            channel,
            key,
        }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Leave the channel as a dropped connection would
    pub async fn disconnect(&self) -> Result<(), LeaseError> {
        Ok(self.channel.untrack(&self.key).await?)
    }
}

#[async_trait]
impl<S, O, L, T> LeaseClient for LocalLeaseClient<S, O, L, T>
where
    S: RecordStore,
    O: OutputSink,
    L: LivenessChannel,
    T: TokenGen,
{
    type Error = LeaseError;

    async fn acquire(&self, resource: &ResourceId) -> Result<AcquireOutcome, LeaseError> {
        self.reclaimer.leases().acquire(resource).await
    }

    async fn bind(&self, resource: &ResourceId, token: &HolderToken) -> Result<(), LeaseError> {
        let payload = PresencePayload::bound(resource.clone(), token.clone());
        Ok(self.channel.track(&self.key, payload).await?)
    }

    async fn unlock(&self, resource: &ResourceId, token: &HolderToken) -> Result<(), LeaseError> {
        let outcome = self
            .reclaimer
            .reclaim_held_by(resource, token, ReclaimReason::Unlock)
            .await?;
        if matches!(outcome, ReclaimOutcome::Stale) {
            tracing::info!(%resource, key = %self.key, "lease already moved on at unlock");
        }
        self.channel
            .track(&self.key, PresencePayload::empty())
            .await?;
        Ok(())
    }

    async fn send_output(&self, command: OutputCommand) -> Result<(), LeaseError> {
        Ok(self.reclaimer.outputs().send(command).await?)
    }
}
