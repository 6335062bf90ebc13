// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory record store

use super::{leases_of, RecordStore, StoreError};
use async_trait::async_trait;
use lg_core::{Lease, LeaseState, OutputMeta, Resource, ResourceId};
use lg_storage::{MaterializedState, Operation};
use std::sync::{Arc, Mutex};

/// Record store kept entirely in memory; clones share records.
///
/// Used by the single-process device bridge and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MaterializedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap_or_else(|e| e.into_inner());
            for resource in resources {
                state.apply(&Operation::ResourceUpsert { resource });
            }
        }
        store
    }

    fn apply(&self, op: Operation) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(&op);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.resources.get(id).cloned())
    }

    async fn resources(&self) -> Result<Vec<Resource>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.resources.values().cloned().collect())
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<(), StoreError> {
        self.apply(Operation::ResourceUpsert { resource });
        Ok(())
    }

    async fn lease(&self, id: &ResourceId) -> Result<Lease, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.lease(id))
    }

    async fn leases(&self) -> Result<Vec<Lease>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(leases_of(&state))
    }

    async fn upsert_lease(&self, id: &ResourceId, state: LeaseState) -> Result<(), StoreError> {
        self.apply(Operation::LeaseSet {
            resource: id.clone(),
            state,
        });
        Ok(())
    }

    async fn compare_and_set_lease(
        &self,
        id: &ResourceId,
        expected: &LeaseState,
        new: LeaseState,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if &state.lease(id).state != expected {
            return Ok(false);
        }
        state.apply(&Operation::LeaseSet {
            resource: id.clone(),
            state: new,
        });
        Ok(true)
    }

    async fn output_meta(&self) -> Result<Vec<OutputMeta>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.outputs.values().cloned().collect())
    }

    async fn upsert_output_meta(&self, meta: OutputMeta) -> Result<(), StoreError> {
        self.apply(Operation::OutputMetaUpsert { meta });
        Ok(())
    }
}
