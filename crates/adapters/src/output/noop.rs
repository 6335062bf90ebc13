// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{OutputError, OutputSink};
use async_trait::async_trait;
use lg_core::OutputCommand;

/// Output sink that drops every command.
///
/// Used when no device is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpOutputSink;

impl NoOpOutputSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputSink for NoOpOutputSink {
    async fn send(&self, _command: OutputCommand) -> Result<(), OutputError> {
        Ok(())
    }
}
