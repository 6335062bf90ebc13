// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by lease transitions and reclamation

use crate::presence::ConnectionKey;
use crate::resource::{OutputId, ResourceId};
use crate::token::HolderToken;
use serde::{Deserialize, Serialize};

/// Why a lease was reclaimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimReason {
    /// The holder's presence entry left the liveness channel
    Disconnect,
    /// The holder asked to stop and switch everything off
    Unlock,
    /// An operator forced the release
    Override,
    /// A periodic sweep found no live presence bound to the token
    Orphaned,
}

impl std::fmt::Display for ReclaimReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReclaimReason::Disconnect => "disconnect",
            ReclaimReason::Unlock => "unlock",
            ReclaimReason::Override => "override",
            ReclaimReason::Orphaned => "orphaned",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    LeaseAcquired {
        resource: ResourceId,
        holder: HolderToken,
    },
    LeaseDenied {
        resource: ResourceId,
    },
    LeaseReleased {
        resource: ResourceId,
        holder: HolderToken,
    },
    LeaseReclaimed {
        resource: ResourceId,
        reason: ReclaimReason,
        leds_off: usize,
        failed: Vec<OutputId>,
    },
    OutputFailed {
        resource: Option<ResourceId>,
        output: OutputId,
        error: String,
    },
    PresenceJoined {
        key: ConnectionKey,
    },
    PresenceLeft {
        key: ConnectionKey,
        resource: Option<ResourceId>,
    },
}

impl Event {
    /// Colon-separated name used for pattern subscriptions
    pub fn name(&self) -> String {
        match self {
            Event::LeaseAcquired { .. } => "lease:acquired",
            Event::LeaseDenied { .. } => "lease:denied",
            Event::LeaseReleased { .. } => "lease:released",
            Event::LeaseReclaimed { .. } => "lease:reclaimed",
            Event::OutputFailed { .. } => "output:failed",
            Event::PresenceJoined { .. } => "presence:joined",
            Event::PresenceLeft { .. } => "presence:left",
        }
        .to_string()
    }

    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Event::LeaseAcquired { resource, .. }
            | Event::LeaseDenied { resource }
            | Event::LeaseReleased { resource, .. }
            | Event::LeaseReclaimed { resource, .. } => Some(resource),
            Event::OutputFailed { resource, .. } | Event::PresenceLeft { resource, .. } => {
                resource.as_ref()
            }
            Event::PresenceJoined { .. } => None,
        }
    }
}
