// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output sink chosen by `[device]` configuration

use std::time::Duration;

use async_trait::async_trait;
use lg_adapters::{
    BroadcastOutputSink, LineOutputSink, LivenessChannel, NoOpOutputSink, OutputError, OutputSink,
};
use lg_core::OutputCommand;

use crate::config::{ConfigError, DeviceConfig};

#[derive(Clone)]
pub enum DeviceSink<L> {
    None(NoOpOutputSink),
    Line(LineOutputSink),
    Broadcast(BroadcastOutputSink<L>),
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceSinkError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open device: {0}")]
    Open(#[from] OutputError),
}

impl<L: LivenessChannel> DeviceSink<L> {
    pub async fn open(
        device: &DeviceConfig,
        channel: L,
        timeout: Duration,
    ) -> Result<Self, DeviceSinkError> {
        Ok(match device {
            DeviceConfig::None => DeviceSink::None(NoOpOutputSink::new()),
            DeviceConfig::Line { path, .. } => {
                let sink = LineOutputSink::open(path, device.pin_map()?).await?;
                tracing::info!(path = %path.display(), "writing output commands to device");
                DeviceSink::Line(sink)
            }
            DeviceConfig::Broadcast => {
                DeviceSink::Broadcast(BroadcastOutputSink::new(channel, timeout))
            }
        })
    }
}

#[async_trait]
impl<L: LivenessChannel> OutputSink for DeviceSink<L> {
    async fn send(&self, command: OutputCommand) -> Result<(), OutputError> {
        match self {
            DeviceSink::None(sink) => sink.send(command).await,
            DeviceSink::Line(sink) => sink.send(command).await,
            DeviceSink::Broadcast(sink) => sink.send(command).await,
        }
    }
}
