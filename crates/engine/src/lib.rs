// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Lease engine: acquisition, reclamation and the tasks that trigger it

mod admin;
mod error;
mod leasing;
mod local;
mod manager;
mod monitor;
mod reclaim;
mod relay;
mod session;
mod sweep;

pub use admin::{AdminOverride, ForceReleaseOutcome};
pub use error::LeaseError;
pub use leasing::{Leasing, LeasingConfig, LeasingDeps};
pub use local::LocalLeaseClient;
pub use manager::{AcquireOutcome, LeaseManager, ReleaseOutcome, MAX_CAS_ATTEMPTS};
pub use monitor::{LivenessMonitor, MONITOR_SUBSCRIBER};
pub use reclaim::{ReclaimOutcome, ReclaimReport, Reclaimer};
pub use relay::{locks_update, LeaseRelay, LOCKS_UPDATE_EVENT};
pub use session::{run_with_lease, standard_routine, LeaseClient, SessionOutcome, Step};
pub use sweep::{OrphanSweep, SweepConfig};
