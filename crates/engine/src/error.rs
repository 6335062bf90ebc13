// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lease engine

use lg_adapters::{ChannelError, OutputError, StoreError};
use thiserror::Error;

/// Unexpected failures. Conflicts and missing resources are outcomes, not errors.
#[derive(Debug, Clone, Error)]
pub enum LeaseError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl LeaseError {
    /// Whether the failure was a call running past its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            LeaseError::Store(StoreError::Timeout { .. })
                | LeaseError::Channel(ChannelError::Timeout { .. })
                | LeaseError::Output(OutputError::Timeout(_))
        )
    }
}
