// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwards lease changes from the event bus to channel subscribers

use lg_adapters::LivenessChannel;
use lg_core::{Event, EventBus, EventPattern, EventReceiver, SubscriberId, Subscription};
use serde_json::json;
use tokio::sync::watch;

/// Broadcast event name lease changes go out under
pub const LOCKS_UPDATE_EVENT: &str = "locks_update";

const RELAY_SUBSCRIBER: &str = "lease-relay";

/// Payload broadcast for one lease change
pub fn locks_update(event: &Event) -> serde_json::Value {
    json!({
        "event": event.name(),
        "resource": event.resource(),
        "detail": event,
    })
}

pub struct LeaseRelay<L> {
    channel: L,
    rx: EventReceiver,
    events: EventBus,
}

impl<L: LivenessChannel> LeaseRelay<L> {
    /// Subscribe to `lease:*` on the bus right away so nothing published
    /// after construction is missed.
    pub fn new(events: EventBus, channel: L) -> Self {
        let rx = events.subscribe(Subscription::new(
            RELAY_SUBSCRIBER,
            vec![EventPattern::new("lease:*")],
        ));
        Self {
            channel,
            rx,
            events,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("lease relay started");
        loop {
            tokio::select! {
                event = self.rx.recv() => {
                    let Some(event) = event else { break };
                    // Fire and forget; a failed broadcast loses one notification
                    if let Err(e) = self
                        .channel
                        .broadcast(LOCKS_UPDATE_EVENT, locks_update(&event))
                        .await
                    {
                        tracing::warn!(event = %event.name(), error = %e, "lease broadcast failed");
                    }
                }
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
            }
        }
        self.events
            .unsubscribe(&SubscriberId(RELAY_SUBSCRIBER.to_string()));
        tracing::info!("lease relay stopped");
    }
}
