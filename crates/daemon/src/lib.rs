// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Lease daemon library: protocol, configuration, lifecycle and server

pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;
mod sink;

pub use config::{ConfigError, DeviceConfig, ProjectConfig, CONFIG_FILE};
pub use lifecycle::{
    project_hash, startup, Config, DaemonLeasing, DaemonState, LifecycleError, ShutdownHandle,
    STARTUP_ERROR_PREFIX, STARTUP_MARKER_PREFIX,
};
pub use protocol::{
    LeaseSummary, ProtocolError, ReclaimSummary, Request, Response, PROTOCOL_VERSION,
};
pub use server::{run, ServerError, RETRY_MESSAGE};
pub use sink::{DeviceSink, DeviceSinkError};
