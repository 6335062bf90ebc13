// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented device writer
//!
//! Writes one `LEVEL:PIN\n` line per command, e.g. `OFF:A0`. Serial
//! microcontroller bridges read this format directly.

use super::{OutputError, OutputSink};
use async_trait::async_trait;
use lg_core::{OutputCommand, OutputId};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Maps output ids to device pin labels.
///
/// An empty map passes output ids through unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinMap(BTreeMap<OutputId, String>);

impl PinMap {
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// The eight-output bench board: 1-6 on digital pins 2-7, 7-8 on A0-A1
    pub fn bench_board() -> Self {
        Self::from_pairs([
            (1, "2"),
            (2, "3"),
            (3, "4"),
            (4, "5"),
            (5, "6"),
            (6, "7"),
            (7, "A0"),
            (8, "A1"),
        ])
    }

    pub fn from_pairs<P: Into<String>>(pairs: impl IntoIterator<Item = (u32, P)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(output, pin)| (OutputId(output), pin.into()))
                .collect(),
        )
    }

    pub fn pin(&self, output: OutputId) -> Result<String, OutputError> {
        if self.0.is_empty() {
            return Ok(output.to_string());
        }
        self.0
            .get(&output)
            .cloned()
            .ok_or(OutputError::UnknownOutput(output))
    }
}

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Clone)]
pub struct LineOutputSink {
    writer: Arc<Mutex<Writer>>,
    pins: PinMap,
}

impl LineOutputSink {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static, pins: PinMap) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            pins,
        }
    }

    /// Open a device file (or named pipe) for appending
    pub async fn open(path: &Path, pins: PinMap) -> Result<Self, OutputError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| OutputError::Device(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(file, pins))
    }
}

#[async_trait]
impl OutputSink for LineOutputSink {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError> {
        let pin = self.pins.pin(command.output)?;
        let line = format!("{}:{}\n", command.level, pin);

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| OutputError::Device(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| OutputError::Device(e.to_string()))
    }
}

#[cfg(test)]
#[path = "line_tests.rs"]
mod tests;
