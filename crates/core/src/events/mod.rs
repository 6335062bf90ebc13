// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event routing
//!
//! Lease transitions and reclamations publish [`crate::Event`]s here. The
//! daemon relays them to attached clients; tests subscribe to assert on them.

mod bus;
mod subscription;

pub use bus::{EventBus, EventReceiver, EventSender};
pub use subscription::{EventPattern, SubscriberId, Subscription};
