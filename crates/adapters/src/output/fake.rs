// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake output sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{OutputError, OutputSink};
use async_trait::async_trait;
use lg_core::{OutputCommand, OutputId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    calls: Vec<OutputCommand>,
    failing: HashSet<OutputId>,
    fail_all: bool,
    delay: Option<Duration>,
}

/// Records every command; failures can be injected per output
#[derive(Clone, Default)]
pub struct FakeOutputSink {
    state: Arc<Mutex<FakeState>>,
}

impl FakeOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempted command, including failed ones, in order
    pub fn calls(&self) -> Vec<OutputCommand> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    pub fn fail_output(&self, output: OutputId) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing
            .insert(output);
    }

    pub fn fail_all(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail_all = true;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).delay = delay;
    }
}

#[async_trait]
impl OutputSink for FakeOutputSink {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError> {
        let (fail, delay) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(command);
            (
                state.fail_all || state.failing.contains(&command.output),
                state.delay,
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(OutputError::Device(format!("injected failure for {}", command)));
        }
        Ok(())
    }
}
