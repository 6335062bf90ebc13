// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease manager: acquire, release and query
//!
//! Every acquire is a read followed by a compare-and-set against the value
//! read. Two concurrent acquires of a free lease can both read "free", but
//! only one compare-and-set applies.

use crate::error::LeaseError;
use lg_adapters::RecordStore;
use lg_core::{
    Event, EventBus, HolderToken, LeaseInput, LeaseSnapshot, Resource, ResourceId, TokenGen,
};
use serde::{Deserialize, Serialize};

/// Compare-and-set rounds before a contended acquire reports `Locked`
pub const MAX_CAS_ATTEMPTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcquireOutcome {
    Acquired { token: HolderToken },
    Locked,
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released { holder: HolderToken },
    AlreadyFree,
    NotFound,
}

impl ReleaseOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReleaseOutcome::NotFound)
    }
}

#[derive(Clone)]
pub struct LeaseManager<S, T> {
    store: S,
    tokens: T,
    events: EventBus,
}

impl<S: RecordStore, T: TokenGen> LeaseManager<S, T> {
    pub fn new(store: S, tokens: T, events: EventBus) -> Self {
        Self {
            store,
            tokens,
            events,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn acquire(&self, id: &ResourceId) -> Result<AcquireOutcome, LeaseError> {
        if self.store.resource(id).await?.is_none() {
            tracing::info!(%id, "acquire of unknown resource");
            return Ok(AcquireOutcome::NotFound);
        }

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let lease = self.store.lease(id).await?;
            let token = self.tokens.issue();
            let (next, events) = lease.transition(LeaseInput::Acquire {
                holder: token.clone(),
            });

            if next == lease {
                tracing::info!(%id, "resource currently in use");
                self.events.publish_all(events);
                return Ok(AcquireOutcome::Locked);
            }

            if self
                .store
                .compare_and_set_lease(id, &lease.state, next.state)
                .await?
            {
                tracing::info!(%id, "lease acquired");
                self.events.publish_all(events);
                return Ok(AcquireOutcome::Acquired { token });
            }

            tracing::debug!(%id, attempt, "lost compare-and-set, re-reading");
        }

        tracing::warn!(%id, attempts = MAX_CAS_ATTEMPTS, "acquire gave up under contention");
        self.events.publish(Event::LeaseDenied {
            resource: id.clone(),
        });
        Ok(AcquireOutcome::Locked)
    }

    /// Free the lease whoever holds it. Releasing a free lease is a no-op.
    ///
    /// The write is conditional on the state that was read, so an acquire
    /// landing in between is never evicted.
    pub async fn release(&self, id: &ResourceId) -> Result<ReleaseOutcome, LeaseError> {
        if self.store.resource(id).await?.is_none() {
            return Ok(ReleaseOutcome::NotFound);
        }

        let lease = self.store.lease(id).await?;
        let Some(holder) = lease.holder().cloned() else {
            return Ok(ReleaseOutcome::AlreadyFree);
        };

        let (next, events) = lease.transition(LeaseInput::Release);
        let applied = self
            .store
            .compare_and_set_lease(id, &lease.state, next.state)
            .await?;
        if applied {
            tracing::info!(%id, "lease released");
            self.events.publish_all(events);
        } else {
            // A held lease only moves to free, so another release got there first
            tracing::debug!(%id, %holder, "lease already released concurrently");
        }
        Ok(ReleaseOutcome::Released { holder })
    }

    /// Free the lease only while `token` still holds it.
    ///
    /// Returns false when the lease is free or held under another token.
    pub async fn release_held(
        &self,
        id: &ResourceId,
        token: &HolderToken,
    ) -> Result<bool, LeaseError> {
        let lease = self.store.lease(id).await?;
        let (next, events) = lease.transition(LeaseInput::ReleaseHeld {
            holder: token.clone(),
        });
        if next == lease {
            return Ok(false);
        }

        let applied = self
            .store
            .compare_and_set_lease(id, &lease.state, next.state)
            .await?;
        if applied {
            tracing::info!(%id, "lease released by holder");
            self.events.publish_all(events);
        }
        Ok(applied)
    }

    /// Current lease state; resources never leased read as idle
    pub async fn query(&self, id: &ResourceId) -> Result<LeaseSnapshot, LeaseError> {
        Ok(self.store.lease(id).await?.snapshot())
    }

    /// Every resource with its lease state
    pub async fn list(&self) -> Result<Vec<(Resource, LeaseSnapshot)>, LeaseError> {
        let resources = self.store.resources().await?;
        let mut listing = Vec::with_capacity(resources.len());
        for resource in resources {
            let snapshot = self.store.lease(&resource.id).await?.snapshot();
            listing.push((resource, snapshot));
        }
        Ok(listing)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
