// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease state machine for exclusive resource ownership
//!
//! A lease is either free or held under exactly one holder token. Transitions
//! are pure: persisting the result is the caller's job and must go through a
//! compare-and-set on the record store.

use crate::event::Event;
use crate::resource::ResourceId;
use crate::token::HolderToken;
use serde::{Deserialize, Serialize};

/// Stored state of one lease.
///
/// `Held` always carries a token, so `busy` and `holder` can never disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeaseState {
    #[default]
    Free,
    Held {
        holder: HolderToken,
    },
}

impl LeaseState {
    pub fn is_free(&self) -> bool {
        matches!(self, LeaseState::Free)
    }

    pub fn holder(&self) -> Option<&HolderToken> {
        match self {
            LeaseState::Free => None,
            LeaseState::Held { holder } => Some(holder),
        }
    }

    pub fn is_held_by(&self, token: &HolderToken) -> bool {
        self.holder() == Some(token)
    }
}

/// A lease bound to the resource it governs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    pub resource: ResourceId,
    pub state: LeaseState,
}

/// Inputs that can move a lease
#[derive(Clone, Debug)]
pub enum LeaseInput {
    /// Take the lease under a freshly issued token
    Acquire { holder: HolderToken },
    /// Free the lease whoever holds it
    Release,
    /// Free the lease only while it is still held under `holder`
    ReleaseHeld { holder: HolderToken },
}

/// Read-only view of a lease as reported to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseSnapshot {
    pub resource: ResourceId,
    pub busy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<HolderToken>,
}

impl Lease {
    pub fn new(resource: ResourceId, state: LeaseState) -> Self {
        Self { resource, state }
    }

    pub fn free(resource: ResourceId) -> Self {
        Self::new(resource, LeaseState::Free)
    }

    pub fn is_free(&self) -> bool {
        self.state.is_free()
    }

    pub fn holder(&self) -> Option<&HolderToken> {
        self.state.holder()
    }

    pub fn is_held_by(&self, token: &HolderToken) -> bool {
        self.state.is_held_by(token)
    }

    pub fn snapshot(&self) -> LeaseSnapshot {
        LeaseSnapshot {
            resource: self.resource.clone(),
            busy: !self.is_free(),
            holder: self.holder().cloned(),
        }
    }

    /// Pure state transition function
    pub fn transition(&self, input: LeaseInput) -> (Lease, Vec<Event>) {
        let mut next = self.clone();
        let mut events = Vec::new();

        match input {
            LeaseInput::Acquire { holder } => match &self.state {
                LeaseState::Free => {
                    next.state = LeaseState::Held {
                        holder: holder.clone(),
                    };
                    events.push(Event::LeaseAcquired {
                        resource: self.resource.clone(),
                        holder,
                    });
                }
                LeaseState::Held { .. } => {
                    events.push(Event::LeaseDenied {
                        resource: self.resource.clone(),
                    });
                }
            },

            LeaseInput::Release => {
                if let LeaseState::Held { holder } = &self.state {
                    next.state = LeaseState::Free;
                    events.push(Event::LeaseReleased {
                        resource: self.resource.clone(),
                        holder: holder.clone(),
                    });
                }
            }

            LeaseInput::ReleaseHeld { holder } => {
                // A mismatched token means the lease has moved on; leave it alone
                if self.is_held_by(&holder) {
                    next.state = LeaseState::Free;
                    events.push(Event::LeaseReleased {
                        resource: self.resource.clone(),
                        holder,
                    });
                }
            }
        }

        (next, events)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
