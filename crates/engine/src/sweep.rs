// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic orphan sweep
//!
//! Leave events are best effort. The sweep covers lost ones: a held lease
//! whose token no live presence entry carries is a suspect, and a suspect
//! that stays unbound for the grace period is reclaimed through the same
//! token-checked path the liveness monitor uses.

use crate::error::LeaseError;
use crate::reclaim::{ReclaimOutcome, Reclaimer};
use lg_adapters::{LivenessChannel, OutputSink, RecordStore};
use lg_core::{Clock, HolderToken, ReclaimReason, ResourceId, TokenGen};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepConfig {
    /// How often to sweep
    pub interval: Duration,
    /// How long a held lease may go unbound before it is reclaimed
    pub grace: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            grace: Duration::from_secs(10),
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

#[derive(Clone)]
pub struct OrphanSweep<S, O, L, T, C> {
    reclaimer: Reclaimer<S, O, T>,
    channel: L,
    clock: C,
    config: SweepConfig,
    /// Unbound leases and when they were first seen unbound
    suspects: Arc<Mutex<HashMap<ResourceId, (HolderToken, Instant)>>>,
}

impl<S, O, L, T, C> OrphanSweep<S, O, L, T, C>
where
    S: RecordStore,
    O: OutputSink,
    L: LivenessChannel,
    T: TokenGen,
    C: Clock,
{
    pub fn new(reclaimer: Reclaimer<S, O, T>, channel: L, clock: C, config: SweepConfig) -> Self {
        Self {
            reclaimer,
            channel,
            clock,
            config,
            suspects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run one sweep; returns the outcome of every reclaim attempted
    pub async fn tick(&self) -> Result<Vec<(ResourceId, ReclaimOutcome)>, LeaseError> {
        let leases = self.reclaimer.leases().store().leases().await?;
        let bound: HashSet<(ResourceId, HolderToken)> = self
            .channel
            .presence()
            .await?
            .into_iter()
            .filter_map(|(_, payload)| match (payload.resource, payload.holder) {
                (Some(resource), Some(holder)) => Some((resource, holder)),
                _ => None,
            })
            .collect();

        let now = self.clock.now();
        let mut due = Vec::new();
        {
            let mut suspects = self.suspects.lock().unwrap_or_else(|e| e.into_inner());
            let mut seen = HashSet::new();

            for lease in &leases {
                let Some(holder) = lease.holder() else {
                    continue;
                };
                if bound.contains(&(lease.resource.clone(), holder.clone())) {
                    continue;
                }
                seen.insert(lease.resource.clone());

                let entry = suspects
                    .entry(lease.resource.clone())
                    .or_insert_with(|| (holder.clone(), now));
                if &entry.0 != holder {
                    *entry = (holder.clone(), now);
                }
                if now.saturating_duration_since(entry.1) >= self.config.grace {
                    due.push((lease.resource.clone(), holder.clone()));
                }
            }

            suspects.retain(|id, _| seen.contains(id));
            for (id, _) in &due {
                suspects.remove(id);
            }
        }

        let mut results = Vec::with_capacity(due.len());
        for (id, token) in due {
            tracing::warn!(%id, "lease has no live holder, reclaiming");
            let outcome = self
                .reclaimer
                .reclaim_held_by(&id, &token, ReclaimReason::Orphaned)
                .await?;
            results.push((id, outcome));
        }
        Ok(results)
    }

    /// Number of leases currently waiting out their grace period
    pub fn suspect_count(&self) -> usize {
        self.suspects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval = ?self.config.interval, grace = ?self.config.grace, "orphan sweep started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(reclaimed) if !reclaimed.is_empty() => {
                            tracing::info!(count = reclaimed.len(), "sweep reclaimed orphaned leases");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "sweep failed"),
                    }
                }
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
            }
        }
        tracing::info!("orphan sweep stopped");
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
