// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness monitor: reclaims leases whose holder's presence left.
//!
//! Leave events carry the last payload the departed connection tracked.
//! The token in that payload is compared with the stored lease before any
//! output is touched, so a delayed leave from an earlier holder is ignored.

use crate::error::LeaseError;
use crate::reclaim::{ReclaimOutcome, Reclaimer};
use lg_adapters::{
    subscribe_bounded, ChannelEvent, ChannelReceiver, LivenessChannel, OutputSink, PresenceEvent,
    RecordStore,
};
use lg_core::{ReclaimReason, TokenGen};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Subscriber name the monitor registers on the channel
pub const MONITOR_SUBSCRIBER: &str = "lease-monitor";

#[derive(Clone)]
pub struct LivenessMonitor<S, O, L, T> {
    reclaimer: Reclaimer<S, O, T>,
    channel: L,
    timeout: Duration,
}

impl<S, O, L, T> LivenessMonitor<S, O, L, T>
where
    S: RecordStore,
    O: OutputSink,
    L: LivenessChannel,
    T: TokenGen,
{
    pub fn new(reclaimer: Reclaimer<S, O, T>, channel: L, timeout: Duration) -> Self {
        Self {
            reclaimer,
            channel,
            timeout,
        }
    }

    /// Open the presence subscription; a timed-out attempt is torn down
    pub async fn subscribe(&self) -> Result<ChannelReceiver, LeaseError> {
        Ok(subscribe_bounded(&self.channel, MONITOR_SUBSCRIBER, self.timeout).await?)
    }

    /// React to one presence event.
    ///
    /// Each departed payload is checked and reclaimed on its own task, so
    /// departures from unrelated resources never wait on each other.
    pub async fn handle_event(
        &self,
        event: PresenceEvent,
    ) -> Vec<Result<ReclaimOutcome, LeaseError>> {
        let (key, left) = match event {
            PresenceEvent::Sync { online } => {
                tracing::debug!(online, "presence sync");
                return Vec::new();
            }
            PresenceEvent::Join { key, .. } => {
                tracing::debug!(%key, "presence joined");
                return Vec::new();
            }
            PresenceEvent::Leave { key, left } => (key, left),
        };

        let mut tasks = JoinSet::new();
        for payload in left {
            let Some((resource, token)) = payload.reclaim_target() else {
                continue;
            };
            let (resource, token) = (resource.clone(), token.clone());
            tracing::info!(%key, %resource, "holder presence left, checking lease");

            let reclaimer = self.reclaimer.clone();
            tasks.spawn(async move {
                reclaimer
                    .reclaim_held_by(&resource, &token, ReclaimReason::Disconnect)
                    .await
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if let Err(e) = &result {
                        tracing::error!(error = %e, "reclaim after disconnect failed");
                    }
                    results.push(result);
                }
                Err(e) => tracing::error!(error = %e, "reclaim task panicked"),
            }
        }
        results
    }

    /// Consume channel events until shutdown or the channel closes.
    ///
    /// Each event is handled on its own task; reclaims still running at
    /// shutdown are finished before this returns.
    pub async fn run(self, mut rx: ChannelReceiver, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("liveness monitor started");
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        tracing::warn!("presence channel closed");
                        break;
                    };
                    if let ChannelEvent::Presence(presence) = event {
                        let monitor = self.clone();
                        in_flight.spawn(async move {
                            monitor.handle_event(presence).await;
                        });
                    }
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }
        if !in_flight.is_empty() {
            tracing::info!(pending = in_flight.len(), "waiting for in-flight reclaims");
        }
        while in_flight.join_next().await.is_some() {}
        if let Err(e) = self.channel.unsubscribe(MONITOR_SUBSCRIBER).await {
            tracing::warn!(error = %e, "failed to unsubscribe monitor");
        }
        tracing::info!("liveness monitor stopped");
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
