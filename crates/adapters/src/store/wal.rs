// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record store persisted through the write-ahead log

use super::{leases_of, RecordStore, StoreError};
use async_trait::async_trait;
use lg_core::{Lease, LeaseState, OutputMeta, Resource, ResourceId};
use lg_storage::{MaterializedState, Operation, Wal};
use std::path::Path;
use std::sync::{Arc, Mutex};

struct Inner {
    state: MaterializedState,
    wal: Wal,
}

impl Inner {
    /// Log first, then apply; a failed append leaves state untouched
    fn commit(&mut self, op: Operation) -> Result<(), StoreError> {
        self.wal.append(&op)?;
        self.state.apply(&op);
        Ok(())
    }
}

/// Durable record store; clones share the same log
#[derive(Clone)]
pub struct WalStore {
    inner: Arc<Mutex<Inner>>,
}

impl WalStore {
    /// Replay the log at `path` and compact it to one entry per record
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let ops = Wal::replay(path)?;
        let state = MaterializedState::from_ops(&ops);
        let mut wal = Wal::open(path)?;
        wal.compact(&state.snapshot_ops())?;

        tracing::info!(
            path = %path.display(),
            replayed = ops.len(),
            resources = state.resources.len(),
            "opened record store"
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { state, wal })),
        })
    }

    fn commit(&self, op: Operation) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .commit(op)
    }

    fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&inner.state)
    }
}

#[async_trait]
impl RecordStore for WalStore {
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError> {
        Ok(self.read(|s| s.resources.get(id).cloned()))
    }

    async fn resources(&self) -> Result<Vec<Resource>, StoreError> {
        Ok(self.read(|s| s.resources.values().cloned().collect()))
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<(), StoreError> {
        self.commit(Operation::ResourceUpsert { resource })
    }

    async fn lease(&self, id: &ResourceId) -> Result<Lease, StoreError> {
        Ok(self.read(|s| s.lease(id)))
    }

    async fn leases(&self) -> Result<Vec<Lease>, StoreError> {
        Ok(self.read(leases_of))
    }

    async fn upsert_lease(&self, id: &ResourceId, state: LeaseState) -> Result<(), StoreError> {
        self.commit(Operation::LeaseSet {
            resource: id.clone(),
            state,
        })
    }

    async fn compare_and_set_lease(
        &self,
        id: &ResourceId,
        expected: &LeaseState,
        new: LeaseState,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if &inner.state.lease(id).state != expected {
            return Ok(false);
        }
        inner.commit(Operation::LeaseSet {
            resource: id.clone(),
            state: new,
        })?;
        Ok(true)
    }

    async fn output_meta(&self) -> Result<Vec<OutputMeta>, StoreError> {
        Ok(self.read(|s| s.outputs.values().cloned().collect()))
    }

    async fn upsert_output_meta(&self, meta: OutputMeta) -> Result<(), StoreError> {
        self.commit(Operation::OutputMetaUpsert { meta })
    }
}
