// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::output::{OutputError, OutputSink};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use tracing::Instrument;
use lg_core::{Lease, LeaseState, OutputCommand, OutputMeta, Resource, ResourceId};

/// Wrapper that adds tracing to any RecordStore
#[derive(Clone)]
pub struct TracedRecordStore<S> {
    inner: S,
}

impl<S> TracedRecordStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for TracedRecordStore<S> {
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError> {
        let result = self.inner.resource(id).await;
        tracing::trace!(%id, found = ?result.as_ref().map(|r| r.is_some()).ok(), "read resource");
        result
    }

    async fn resources(&self) -> Result<Vec<Resource>, StoreError> {
        let result = self.inner.resources().await;
        tracing::trace!(count = result.as_ref().map(|v| v.len()).ok(), "listed resources");
        result
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.upsert_resource", id = %resource.id);
        let outputs = resource.outputs.len();
        async {
            let result = self.inner.upsert_resource(resource).await;
            match &result {
                Ok(()) => tracing::info!(outputs, "resource stored"),
                Err(e) => tracing::error!(error = %e, "upsert failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn lease(&self, id: &ResourceId) -> Result<Lease, StoreError> {
        let result = self.inner.lease(id).await;
        if let Err(e) = &result {
            tracing::error!(%id, error = %e, "lease read failed");
        }
        result
    }

    async fn leases(&self) -> Result<Vec<Lease>, StoreError> {
        let result = self.inner.leases().await;
        tracing::trace!(count = result.as_ref().map(|v| v.len()).ok(), "listed leases");
        result
    }

    async fn upsert_lease(&self, id: &ResourceId, state: LeaseState) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.upsert_lease", %id, busy = !state.is_free());

        let start = std::time::Instant::now();
        let result = self.inner.upsert_lease(id, state).instrument(span.clone()).await;
        let elapsed = start.elapsed();
        let _guard = span.enter();

        match &result {
            Ok(()) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "lease written"),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "lease write failed"
            ),
        }
        result
    }

    async fn compare_and_set_lease(
        &self,
        id: &ResourceId,
        expected: &LeaseState,
        new: LeaseState,
    ) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.cas_lease", %id, busy = !new.is_free());

        let start = std::time::Instant::now();
        let result = self
            .inner
            .compare_and_set_lease(id, expected, new)
            .instrument(span.clone())
            .await;
        let elapsed = start.elapsed();
        let _guard = span.enter();

        match &result {
            Ok(true) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "applied"),
            Ok(false) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "lost race"),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "compare-and-set failed"
            ),
        }
        result
    }

    async fn output_meta(&self) -> Result<Vec<OutputMeta>, StoreError> {
        self.inner.output_meta().await
    }

    async fn upsert_output_meta(&self, meta: OutputMeta) -> Result<(), StoreError> {
        let id = meta.id;
        let result = self.inner.upsert_output_meta(meta).await;
        if let Err(e) = &result {
            tracing::error!(output = %id, error = %e, "output metadata write failed");
        }
        result
    }
}

/// Wrapper that adds tracing to any OutputSink
#[derive(Clone)]
pub struct TracedOutputSink<O> {
    inner: O,
}

impl<O> TracedOutputSink<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<O: OutputSink> OutputSink for TracedOutputSink<O> {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError> {
        let span = tracing::info_span!("output.send", %command);

        let start = std::time::Instant::now();
        let result = self.inner.send(command).instrument(span.clone()).await;
        let elapsed = start.elapsed();
        let _guard = span.enter();

        match &result {
            Ok(()) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "sent"),
            // Callers decide whether a failed output is fatal
            Err(e) => tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "send failed"
            ),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
