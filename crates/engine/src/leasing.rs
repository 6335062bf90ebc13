// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Facade bundling the lease components over one set of adapters

use crate::admin::{AdminOverride, ForceReleaseOutcome};
use crate::error::LeaseError;
use crate::local::LocalLeaseClient;
use crate::manager::{AcquireOutcome, LeaseManager, ReleaseOutcome};
use crate::monitor::LivenessMonitor;
use crate::reclaim::Reclaimer;
use crate::relay::LeaseRelay;
use crate::sweep::{OrphanSweep, SweepConfig};
use lg_adapters::{LivenessChannel, OutputSink, RecordStore, DEFAULT_CALL_TIMEOUT};
use lg_core::{
    Clock, ConnectionKey, EventBus, HolderToken, LeaseSnapshot, OutputCommand, OutputMeta,
    Resource, ResourceId, TokenGen,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Timing knobs for the background tasks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeasingConfig {
    /// Bound on opening the monitor's presence subscription
    pub subscribe_timeout: Duration,
    pub sweep: SweepConfig,
}

impl Default for LeasingConfig {
    fn default() -> Self {
        Self {
            subscribe_timeout: DEFAULT_CALL_TIMEOUT,
            sweep: SweepConfig::default(),
        }
    }
}

/// Adapter dependencies
pub struct LeasingDeps<S, O, L> {
    pub store: S,
    pub outputs: O,
    pub channel: L,
}

pub struct Leasing<S, O, L, T, C> {
    admin: AdminOverride<S, O, T>,
    reclaimer: Reclaimer<S, O, T>,
    channel: L,
    clock: C,
    config: LeasingConfig,
}

impl<S, O, L, T, C> Leasing<S, O, L, T, C>
where
    S: RecordStore,
    O: OutputSink,
    L: LivenessChannel,
    T: TokenGen,
    C: Clock,
{
    pub fn new(deps: LeasingDeps<S, O, L>, tokens: T, clock: C, config: LeasingConfig) -> Self {
        let manager = LeaseManager::new(deps.store, tokens, EventBus::new());
        let reclaimer = Reclaimer::new(manager, deps.outputs);
        Self {
            admin: AdminOverride::new(reclaimer.clone()),
            reclaimer,
            channel: deps.channel,
            clock,
            config,
        }
    }

    pub fn manager(&self) -> &LeaseManager<S, T> {
        self.reclaimer.leases()
    }

    pub fn reclaimer(&self) -> &Reclaimer<S, O, T> {
        &self.reclaimer
    }

    pub fn channel(&self) -> &L {
        &self.channel
    }

    pub fn events(&self) -> &EventBus {
        self.manager().events()
    }

    pub fn config(&self) -> &LeasingConfig {
        &self.config
    }

    pub async fn acquire(&self, id: &ResourceId) -> Result<AcquireOutcome, LeaseError> {
        self.manager().acquire(id).await
    }

    pub async fn release(&self, id: &ResourceId) -> Result<ReleaseOutcome, LeaseError> {
        self.manager().release(id).await
    }

    pub async fn release_held(
        &self,
        id: &ResourceId,
        token: &HolderToken,
    ) -> Result<bool, LeaseError> {
        self.manager().release_held(id, token).await
    }

    pub async fn query(&self, id: &ResourceId) -> Result<LeaseSnapshot, LeaseError> {
        self.manager().query(id).await
    }

    pub async fn list(&self) -> Result<Vec<(Resource, LeaseSnapshot)>, LeaseError> {
        self.manager().list().await
    }

    pub async fn force_release(&self, id: &ResourceId) -> Result<ForceReleaseOutcome, LeaseError> {
        self.admin.force_release(id).await
    }

    pub async fn force_release_all(
        &self,
    ) -> Result<Vec<(ResourceId, ForceReleaseOutcome)>, LeaseError> {
        self.admin.force_release_all().await
    }

    /// Relay one ON/OFF command to the output sink. Best effort.
    pub async fn send_output(&self, command: OutputCommand) -> Result<(), LeaseError> {
        tracing::debug!(%command, "relaying output command");
        Ok(self.reclaimer.outputs().send(command).await?)
    }

    /// Display metadata for outputs, ordered by id
    pub async fn output_meta(&self) -> Result<Vec<OutputMeta>, LeaseError> {
        Ok(self.manager().store().output_meta().await?)
    }

    /// Seed resources, e.g. from configuration. Existing leases are kept.
    pub async fn seed(
        &self,
        resources: impl IntoIterator<Item = Resource>,
    ) -> Result<usize, LeaseError> {
        let mut count = 0;
        for resource in resources {
            self.manager().store().upsert_resource(resource).await?;
            count += 1;
        }
        Ok(count)
    }

    pub fn monitor(&self) -> LivenessMonitor<S, O, L, T> {
        LivenessMonitor::new(
            self.reclaimer.clone(),
            self.channel.clone(),
            self.config.subscribe_timeout,
        )
    }

    pub fn sweep(&self) -> OrphanSweep<S, O, L, T, C> {
        OrphanSweep::new(
            self.reclaimer.clone(),
            self.channel.clone(),
            self.clock.clone(),
            self.config.sweep.clone(),
        )
    }

    pub fn relay(&self) -> LeaseRelay<L> {
        LeaseRelay::new(self.events().clone(), self.channel.clone())
    }

    /// In-process client tracking presence under `key`
    pub fn local_client(&self, key: ConnectionKey) -> LocalLeaseClient<S, O, L, T> {
        LocalLeaseClient::new(self.reclaimer.clone(), self.channel.clone(), key)
    }

    /// Start the monitor, sweep and relay. They stop when `shutdown` flips.
    ///
    /// Fails if the presence subscription cannot be opened in time.
    pub async fn spawn_background(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinSet<()>, LeaseError> {
        let monitor = self.monitor();
        let rx = monitor.subscribe().await?;

        let mut tasks = JoinSet::new();
        tasks.spawn(monitor.run(rx, shutdown.clone()));
        tasks.spawn(self.sweep().run(shutdown.clone()));
        tasks.spawn(self.relay().run(shutdown));
        Ok(tasks)
    }
}

#[cfg(test)]
#[path = "leasing_tests.rs"]
mod tests;
