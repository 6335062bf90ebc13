// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lg-core: domain types for exclusive resource leasing
//!
//! This crate provides:
//! - Resources, outputs and the ON/OFF command form
//! - Holder tokens and their generators
//! - Pure state machines for leases and presence bindings
//! - Events and an in-process event bus

pub mod clock;
pub mod events;
pub mod lease;
pub mod output;
pub mod presence;
pub mod resource;
pub mod token;

mod event;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{Event, ReclaimReason};
pub use events::{EventBus, EventPattern, EventReceiver, SubscriberId, Subscription};
pub use lease::{Lease, LeaseInput, LeaseSnapshot, LeaseState};
pub use output::{CommandParseError, OutputCommand, OutputLevel};
pub use presence::{Binding, BindingInput, ConnectionKey, PresencePayload};
pub use resource::{OutputId, OutputMeta, Resource, ResourceId};
pub use token::{HolderToken, SequentialTokenGen, TokenGen, UuidTokenGen};
