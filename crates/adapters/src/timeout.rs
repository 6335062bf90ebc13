// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline wrappers: every collaborator call is bounded

use crate::liveness::{ChannelError, ChannelReceiver, LivenessChannel};
use crate::output::{OutputError, OutputSink};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use lg_core::{
    ConnectionKey, Lease, LeaseState, OutputCommand, OutputMeta, PresencePayload, Resource,
    ResourceId,
};
use std::future::Future;
use std::time::Duration;

/// Default bound for store and channel calls
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

async fn bounded<T, E>(
    after: Duration,
    fut: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E> {
    tokio::time::timeout(after, fut)
        .await
        .unwrap_or_else(|_| Err(on_timeout()))
}

/// Record store whose calls fail with [`StoreError::Timeout`] past a deadline
#[derive(Clone)]
pub struct TimedRecordStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimedRecordStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    fn expired(&self, op: &'static str) -> impl FnOnce() -> StoreError {
        let after = self.timeout;
        move || StoreError::Timeout { op, after }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for TimedRecordStore<S> {
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError> {
        bounded(self.timeout, self.inner.resource(id), self.expired("resource")).await
    }

    async fn resources(&self) -> Result<Vec<Resource>, StoreError> {
        bounded(self.timeout, self.inner.resources(), self.expired("resources")).await
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<(), StoreError> {
        bounded(
            self.timeout,
            self.inner.upsert_resource(resource),
            self.expired("upsert_resource"),
        )
        .await
    }

    async fn lease(&self, id: &ResourceId) -> Result<Lease, StoreError> {
        bounded(self.timeout, self.inner.lease(id), self.expired("lease")).await
    }

    async fn leases(&self) -> Result<Vec<Lease>, StoreError> {
        bounded(self.timeout, self.inner.leases(), self.expired("leases")).await
    }

    async fn upsert_lease(&self, id: &ResourceId, state: LeaseState) -> Result<(), StoreError> {
        bounded(
            self.timeout,
            self.inner.upsert_lease(id, state),
            self.expired("upsert_lease"),
        )
        .await
    }

    async fn compare_and_set_lease(
        &self,
        id: &ResourceId,
        expected: &LeaseState,
        new: LeaseState,
    ) -> Result<bool, StoreError> {
        bounded(
            self.timeout,
            self.inner.compare_and_set_lease(id, expected, new),
            self.expired("compare_and_set_lease"),
        )
        .await
    }

    async fn output_meta(&self) -> Result<Vec<OutputMeta>, StoreError> {
        bounded(self.timeout, self.inner.output_meta(), self.expired("output_meta")).await
    }

    async fn upsert_output_meta(&self, meta: OutputMeta) -> Result<(), StoreError> {
        bounded(
            self.timeout,
            self.inner.upsert_output_meta(meta),
            self.expired("upsert_output_meta"),
        )
        .await
    }
}

/// Output sink whose sends fail with [`OutputError::Timeout`] past a deadline
#[derive(Clone)]
pub struct TimedOutputSink<O> {
    inner: O,
    timeout: Duration,
}

impl<O> TimedOutputSink<O> {
    pub fn new(inner: O, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<O: OutputSink> OutputSink for TimedOutputSink<O> {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError> {
        let after = self.timeout;
        bounded(after, self.inner.send(command), || OutputError::Timeout(after)).await
    }
}

/// Liveness channel with bounded calls.
///
/// A subscribe that times out is torn down before the error is returned.
#[derive(Clone)]
pub struct TimedChannel<L> {
    inner: L,
    timeout: Duration,
}

impl<L> TimedChannel<L> {
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    fn expired(&self, op: &'static str) -> impl FnOnce() -> ChannelError {
        let after = self.timeout;
        move || ChannelError::Timeout { op, after }
    }
}

#[async_trait]
impl<L: LivenessChannel> LivenessChannel for TimedChannel<L> {
    async fn subscribe(&self, subscriber: &str) -> Result<ChannelReceiver, ChannelError> {
        crate::liveness::subscribe_bounded(&self.inner, subscriber, self.timeout).await
    }

    async fn unsubscribe(&self, subscriber: &str) -> Result<(), ChannelError> {
        bounded(
            self.timeout,
            self.inner.unsubscribe(subscriber),
            self.expired("unsubscribe"),
        )
        .await
    }

    async fn track(
        &self,
        key: &ConnectionKey,
        payload: PresencePayload,
    ) -> Result<(), ChannelError> {
        bounded(
            self.timeout,
            self.inner.track(key, payload),
            self.expired("track"),
        )
        .await
    }

    async fn untrack(&self, key: &ConnectionKey) -> Result<(), ChannelError> {
        bounded(self.timeout, self.inner.untrack(key), self.expired("untrack")).await
    }

    async fn broadcast(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), ChannelError> {
        bounded(
            self.timeout,
            self.inner.broadcast(event, payload),
            self.expired("broadcast"),
        )
        .await
    }

    async fn presence(&self) -> Result<Vec<(ConnectionKey, PresencePayload)>, ChannelError> {
        bounded(self.timeout, self.inner.presence(), self.expired("presence")).await
    }
}
