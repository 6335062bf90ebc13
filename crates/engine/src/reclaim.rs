// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reclamation: switch every output of a resource off, then free its lease
//!
//! Output commands go out one at a time in the resource's declared order. A
//! failing output is logged and skipped; the lease is released regardless.

use crate::error::LeaseError;
use crate::manager::LeaseManager;
use lg_adapters::{OutputSink, RecordStore};
use lg_core::{
    Event, HolderToken, OutputCommand, OutputId, ReclaimReason, Resource, ResourceId, TokenGen,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimReport {
    pub resource: ResourceId,
    pub reason: ReclaimReason,
    /// Outputs an OFF command was attempted for, failed ones included
    pub leds_off: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<OutputId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReclaimOutcome {
    Reclaimed(ReclaimReport),
    /// The lease is no longer held under the token the request carried
    Stale,
    NotFound,
}

#[derive(Clone)]
pub struct Reclaimer<S, O, T> {
    leases: LeaseManager<S, T>,
    outputs: O,
}

impl<S, O, T> Reclaimer<S, O, T>
where
    S: RecordStore,
    O: OutputSink,
    T: TokenGen,
{
    pub fn new(leases: LeaseManager<S, T>, outputs: O) -> Self {
        Self { leases, outputs }
    }

    pub fn leases(&self) -> &LeaseManager<S, T> {
        &self.leases
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Switch outputs off and release unconditionally
    pub async fn reclaim(
        &self,
        id: &ResourceId,
        reason: ReclaimReason,
    ) -> Result<ReclaimOutcome, LeaseError> {
        let Some(resource) = self.leases.store().resource(id).await? else {
            return Ok(ReclaimOutcome::NotFound);
        };

        let (leds_off, failed) = self.switch_off(&resource).await;
        self.leases.release(id).await?;

        Ok(ReclaimOutcome::Reclaimed(self.finish(
            id, reason, leds_off, failed,
        )))
    }

    /// Reclaim only if `token` still holds the lease.
    ///
    /// The token is checked before any output is touched, and the final
    /// release is conditional on the same token.
    pub async fn reclaim_held_by(
        &self,
        id: &ResourceId,
        token: &HolderToken,
        reason: ReclaimReason,
    ) -> Result<ReclaimOutcome, LeaseError> {
        let Some(resource) = self.leases.store().resource(id).await? else {
            return Ok(ReclaimOutcome::NotFound);
        };

        let lease = self.leases.store().lease(id).await?;
        if !lease.is_held_by(token) {
            tracing::info!(%id, %reason, "ignoring stale reclaim, lease has moved on");
            return Ok(ReclaimOutcome::Stale);
        }

        let (leds_off, failed) = self.switch_off(&resource).await;
        if !self.leases.release_held(id, token).await? {
            tracing::warn!(%id, "lease changed hands during reclaim, leaving it held");
        }

        Ok(ReclaimOutcome::Reclaimed(self.finish(
            id, reason, leds_off, failed,
        )))
    }

    async fn switch_off(&self, resource: &Resource) -> (usize, Vec<OutputId>) {
        let mut failed = Vec::new();
        for &output in &resource.outputs {
            if let Err(e) = self.outputs.send(OutputCommand::off(output)).await {
                tracing::warn!(resource = %resource.id, %output, error = %e, "output did not switch off");
                self.leases.events().publish(Event::OutputFailed {
                    resource: Some(resource.id.clone()),
                    output,
                    error: e.to_string(),
                });
                failed.push(output);
            }
        }
        (resource.outputs.len(), failed)
    }

    fn finish(
        &self,
        id: &ResourceId,
        reason: ReclaimReason,
        leds_off: usize,
        failed: Vec<OutputId>,
    ) -> ReclaimReport {
        if failed.is_empty() {
            tracing::info!(%id, %reason, leds_off, "reclaimed");
        } else {
            tracing::warn!(%id, %reason, leds_off, failed = failed.len(), "reclaimed with output failures");
        }
        self.leases.events().publish(Event::LeaseReclaimed {
            resource: id.clone(),
            reason,
            leds_off,
            failed: failed.clone(),
        });
        ReclaimReport {
            resource: id.clone(),
            reason,
            leds_off,
            failed,
        }
    }
}

#[cfg(test)]
#[path = "reclaim_tests.rs"]
mod tests;
