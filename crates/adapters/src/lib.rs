// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the lease service's collaborators

pub mod liveness;
pub mod output;
pub mod store;
pub mod timeout;
pub mod traced;

pub use liveness::{
    subscribe_bounded, ChannelError, ChannelEvent, ChannelReceiver, LivenessChannel,
    MemoryChannel, PresenceEvent, PRESENCE_CHANNEL,
};
pub use output::{
    BroadcastOutputSink, LineOutputSink, NoOpOutputSink, OutputError, OutputSink, PinMap,
    OUTPUT_COMMAND_EVENT,
};
pub use store::{MemoryStore, RecordStore, StoreError, WalStore};
pub use timeout::{TimedChannel, TimedOutputSink, TimedRecordStore, DEFAULT_CALL_TIMEOUT};
pub use traced::{TracedOutputSink, TracedRecordStore};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use output::FakeOutputSink;
#[cfg(any(test, feature = "test-support"))]
pub use store::{FakeRecordStore, StoreCall};
