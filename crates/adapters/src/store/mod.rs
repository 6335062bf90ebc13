// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource record store
//!
//! The store is the single source of truth for lease state. Every lease
//! mutation that depends on the current value goes through
//! [`RecordStore::compare_and_set_lease`].

mod memory;
mod wal;

pub use memory::MemoryStore;
pub use wal::WalStore;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRecordStore, StoreCall};

use async_trait::async_trait;
use lg_core::{Lease, LeaseState, OutputMeta, Resource, ResourceId};
use lg_storage::{MaterializedState, WalError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store call {op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("write failed: {0}")]
    Write(String),
}

impl From<WalError> for StoreError {
    fn from(e: WalError) -> Self {
        StoreError::Write(e.to_string())
    }
}

/// Durable records for resources, leases and output metadata
#[async_trait]
pub trait RecordStore: Clone + Send + Sync + 'static {
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError>;

    async fn resources(&self) -> Result<Vec<Resource>, StoreError>;

    async fn upsert_resource(&self, resource: Resource) -> Result<(), StoreError>;

    /// Current lease; a resource never leased reads as free
    async fn lease(&self, id: &ResourceId) -> Result<Lease, StoreError>;

    /// Leases of every known resource, in resource id order
    async fn leases(&self) -> Result<Vec<Lease>, StoreError>;

    /// Unconditional write
    async fn upsert_lease(&self, id: &ResourceId, state: LeaseState) -> Result<(), StoreError>;

    /// Write `new` only if the stored state still equals `expected`.
    ///
    /// Returns whether the write happened.
    async fn compare_and_set_lease(
        &self,
        id: &ResourceId,
        expected: &LeaseState,
        new: LeaseState,
    ) -> Result<bool, StoreError>;

    async fn output_meta(&self) -> Result<Vec<OutputMeta>, StoreError>;

    async fn upsert_output_meta(&self, meta: OutputMeta) -> Result<(), StoreError>;
}

pub(crate) fn leases_of(state: &MaterializedState) -> Vec<Lease> {
    state.resources.keys().map(|id| state.lease(id)).collect()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
