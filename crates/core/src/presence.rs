// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence entries on the liveness channel
//!
//! Each connected client tracks one entry under its connection key. The
//! payload says which resource (and which holder token) the client is bound
//! to; when the entry leaves, the last payload decides what to reclaim.

use crate::event::Event;
use crate::resource::ResourceId;
use crate::token::HolderToken;
use serde::{Deserialize, Serialize};

/// Identifies one client connection on the liveness channel
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a client is bound to. Both fields absent means "connected, idle".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<HolderToken>,
}

impl PresencePayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bound(resource: ResourceId, holder: HolderToken) -> Self {
        Self {
            resource: Some(resource),
            holder: Some(holder),
        }
    }

    /// Resource and token a departure of this payload should reclaim.
    ///
    /// A payload without a token never triggers reclamation.
    pub fn reclaim_target(&self) -> Option<(&ResourceId, &HolderToken)> {
        match (&self.resource, &self.holder) {
            (Some(resource), Some(holder)) => Some((resource, holder)),
            _ => None,
        }
    }
}

/// Presence of one connection key
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Binding {
    #[default]
    Absent,
    Present {
        payload: PresencePayload,
    },
}

#[derive(Clone, Debug)]
pub enum BindingInput {
    /// Join, or replace the payload if already present
    Track(PresencePayload),
    Leave,
}

impl Binding {
    pub fn payload(&self) -> Option<&PresencePayload> {
        match self {
            Binding::Absent => None,
            Binding::Present { payload } => Some(payload),
        }
    }

    pub fn transition(&self, key: &ConnectionKey, input: BindingInput) -> (Binding, Vec<Event>) {
        match (self, input) {
            (Binding::Absent, BindingInput::Track(payload)) => (
                Binding::Present { payload },
                vec![Event::PresenceJoined { key: key.clone() }],
            ),
            (Binding::Present { .. }, BindingInput::Track(payload)) => {
                (Binding::Present { payload }, vec![])
            }
            (Binding::Present { payload }, BindingInput::Leave) => (
                Binding::Absent,
                vec![Event::PresenceLeft {
                    key: key.clone(),
                    resource: payload.resource.clone(),
                }],
            ),
            (Binding::Absent, BindingInput::Leave) => (Binding::Absent, vec![]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ConnectionKey {
        ConnectionKey::new("conn-1")
    }

    fn bound() -> PresencePayload {
        PresencePayload::bound(ResourceId::new("G1"), HolderToken::new("t-1"))
    }

    #[test]
    fn first_track_joins() {
        let (next, events) = Binding::Absent.transition(&key(), BindingInput::Track(bound()));

        assert_eq!(next.payload(), Some(&bound()));
        assert_eq!(events, vec![Event::PresenceJoined { key: key() }]);
    }

    #[test]
    fn retrack_replaces_payload_quietly() {
        let present = Binding::Present {
            payload: PresencePayload::empty(),
        };
        let (next, events) = present.transition(&key(), BindingInput::Track(bound()));

        assert_eq!(next.payload(), Some(&bound()));
        assert!(events.is_empty());
    }

    #[test]
    fn leave_reports_last_resource() {
        let present = Binding::Present { payload: bound() };
        let (next, events) = present.transition(&key(), BindingInput::Leave);

        assert_eq!(next, Binding::Absent);
        assert_eq!(
            events,
            vec![Event::PresenceLeft {
                key: key(),
                resource: Some(ResourceId::new("G1")),
            }]
        );
    }

    #[test]
    fn leave_when_absent_is_noop() {
        let (next, events) = Binding::Absent.transition(&key(), BindingInput::Leave);
        assert_eq!(next, Binding::Absent);
        assert!(events.is_empty());
    }

    #[test]
    fn reclaim_target_needs_token() {
        assert!(PresencePayload::empty().reclaim_target().is_none());

        let no_token = PresencePayload {
            resource: Some(ResourceId::new("G1")),
            holder: None,
        };
        assert!(no_token.reclaim_target().is_none());

        let payload = bound();
        let (resource, holder) = payload.reclaim_target().unwrap();
        assert_eq!(resource.as_str(), "G1");
        assert_eq!(holder.as_str(), "t-1");
    }

    #[test]
    fn payload_serializes_compactly() {
        let json = serde_json::to_string(&PresencePayload::empty()).unwrap();
        assert_eq!(json, "{}");
    }
}
