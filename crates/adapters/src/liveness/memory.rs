// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process liveness channel

use super::{ChannelError, ChannelEvent, ChannelReceiver, LivenessChannel, PresenceEvent};
use async_trait::async_trait;
use lg_core::{Binding, BindingInput, ConnectionKey, Event, PresencePayload};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    presence: BTreeMap<ConnectionKey, Binding>,
    subscribers: HashMap<String, mpsc::UnboundedSender<ChannelEvent>>,
    #[cfg(any(test, feature = "test-support"))]
    subscribe_delay: Option<std::time::Duration>,
}

impl Inner {
    fn emit(&mut self, event: ChannelEvent) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    fn apply(&mut self, key: &ConnectionKey, input: BindingInput) {
        let current = self.presence.get(key).cloned().unwrap_or_default();
        let last = current.payload().cloned();
        let (next, events) = current.transition(key, input);

        match next.payload() {
            Some(_) => {
                self.presence.insert(key.clone(), next.clone());
            }
            None => {
                self.presence.remove(key);
            }
        }

        for event in events {
            match event {
                Event::PresenceJoined { key } => {
                    let payload = next.payload().cloned().unwrap_or_default();
                    tracing::debug!(%key, "presence join");
                    self.emit(ChannelEvent::Presence(PresenceEvent::Join { key, payload }));
                }
                Event::PresenceLeft { key, .. } => {
                    tracing::debug!(%key, "presence leave");
                    let left = last.clone().into_iter().collect();
                    self.emit(ChannelEvent::Presence(PresenceEvent::Leave { key, left }));
                }
                _ => {}
            }
        }
    }
}

/// Liveness channel shared by every connection of one daemon.
///
/// Subscribers whose receiver was dropped are pruned on the next emit.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribers
            .len()
    }

    /// Register subscriptions immediately but answer `subscribe` late
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_subscribe_delay(&self, delay: Option<std::time::Duration>) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribe_delay = delay;
    }
}

#[async_trait]
impl LivenessChannel for MemoryChannel {
    async fn subscribe(&self, subscriber: &str) -> Result<ChannelReceiver, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let online = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.subscribers.insert(subscriber.to_string(), tx.clone());
            inner.presence.len()
        };

        #[cfg(any(test, feature = "test-support"))]
        {
            let delay = self
                .inner
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .subscribe_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        tx.send(ChannelEvent::Presence(PresenceEvent::Sync { online }))
            .map_err(|_| ChannelError::Closed)?;
        Ok(rx)
    }

    async fn unsubscribe(&self, subscriber: &str) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribers
            .remove(subscriber);
        Ok(())
    }

    async fn track(
        &self,
        key: &ConnectionKey,
        payload: PresencePayload,
    ) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(key, BindingInput::Track(payload));
        Ok(())
    }

    async fn untrack(&self, key: &ConnectionKey) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(key, BindingInput::Leave);
        Ok(())
    }

    async fn broadcast(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .emit(ChannelEvent::Broadcast {
                event: event.to_string(),
                payload,
            });
        Ok(())
    }

    async fn presence(&self) -> Result<Vec<(ConnectionKey, PresencePayload)>, ChannelError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .presence
            .iter()
            .filter_map(|(key, binding)| binding.payload().map(|p| (key.clone(), p.clone())))
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
