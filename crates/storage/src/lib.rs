// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lg-storage: durable records for resources and leases
//!
//! Every mutation is appended to a JSONL write-ahead log and replayed into
//! [`MaterializedState`] on startup.

mod operation;
mod state;
mod wal;

pub use operation::Operation;
pub use state::MaterializedState;
pub use wal::{Wal, WalError};
