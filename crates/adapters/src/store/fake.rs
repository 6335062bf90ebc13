// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake record store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MemoryStore, RecordStore, StoreError};
use async_trait::async_trait;
use lg_core::{Lease, LeaseState, OutputMeta, Resource, ResourceId};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded lease write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    UpsertLease {
        id: ResourceId,
        state: LeaseState,
    },
    CompareAndSet {
        id: ResourceId,
        new: LeaseState,
        applied: bool,
    },
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    delay: Option<Duration>,
    /// Number of upcoming compare-and-set calls to report as lost
    lose_cas: usize,
}

/// Memory store with failure injection and a log of lease writes
#[derive(Clone, Default)]
pub struct FakeRecordStore {
    inner: MemoryStore,
    faults: Arc<Mutex<Faults>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        Self {
            inner: MemoryStore::with_resources(resources),
            ..Self::default()
        }
    }

    /// Fail every call with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).unavailable = unavailable;
    }

    /// Sleep before answering every call
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).delay = delay;
    }

    /// Report the next `n` compare-and-set calls as lost without writing
    pub fn lose_next_cas(&self, n: usize) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).lose_cas = n;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn check(&self) -> Result<(), StoreError> {
        let (unavailable, delay) = {
            let faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            (faults.unavailable, faults.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unavailable {
            return Err(StoreError::Unavailable("injected".to_string()));
        }
        Ok(())
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError> {
        self.check().await?;
        self.inner.resource(id).await
    }

    async fn resources(&self) -> Result<Vec<Resource>, StoreError> {
        self.check().await?;
        self.inner.resources().await
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<(), StoreError> {
        self.check().await?;
        self.inner.upsert_resource(resource).await
    }

    async fn lease(&self, id: &ResourceId) -> Result<Lease, StoreError> {
        self.check().await?;
        self.inner.lease(id).await
    }

    async fn leases(&self) -> Result<Vec<Lease>, StoreError> {
        self.check().await?;
        self.inner.leases().await
    }

    async fn upsert_lease(&self, id: &ResourceId, state: LeaseState) -> Result<(), StoreError> {
        self.check().await?;
        self.record(StoreCall::UpsertLease {
            id: id.clone(),
            state: state.clone(),
        });
        self.inner.upsert_lease(id, state).await
    }

    async fn compare_and_set_lease(
        &self,
        id: &ResourceId,
        expected: &LeaseState,
        new: LeaseState,
    ) -> Result<bool, StoreError> {
        self.check().await?;
        let lose = {
            let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            if faults.lose_cas > 0 {
                faults.lose_cas -= 1;
                true
            } else {
                false
            }
        };
        let applied = if lose {
            false
        } else {
            self.inner
                .compare_and_set_lease(id, expected, new.clone())
                .await?
        };
        self.record(StoreCall::CompareAndSet {
            id: id.clone(),
            new,
            applied,
        });
        Ok(applied)
    }

    async fn output_meta(&self) -> Result<Vec<OutputMeta>, StoreError> {
        self.check().await?;
        self.inner.output_meta().await
    }

    async fn upsert_output_meta(&self, meta: OutputMeta) -> Result<(), StoreError> {
        self.check().await?;
        self.inner.upsert_output_meta(meta).await
    }
}
