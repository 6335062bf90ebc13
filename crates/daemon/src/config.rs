// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration from `lg.toml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lg_adapters::{PinMap, DEFAULT_CALL_TIMEOUT};
use lg_core::{OutputMeta, Resource};
use lg_engine::SweepConfig;
use serde::Deserialize;
use thiserror::Error;

/// File name looked up in the project root
pub const CONFIG_FILE: &str = "lg.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("invalid {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("invalid pin mapping for output {0:?}")]
    InvalidPin(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default, rename = "resource")]
    pub resources: Vec<Resource>,
    #[serde(default, rename = "output")]
    pub outputs: Vec<OutputMeta>,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub sweep: SweepSection,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub store: Duration,
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub channel: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: DEFAULT_CALL_TIMEOUT,
            channel: DEFAULT_CALL_TIMEOUT,
        }
    }
}

fn default_call_timeout() -> Duration {
    DEFAULT_CALL_TIMEOUT
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSection {
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub interval: Duration,
    #[serde(with = "humantime_serde", default = "default_sweep_grace")]
    pub grace: Duration,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            interval: default_sweep_interval(),
            grace: default_sweep_grace(),
        }
    }
}

fn default_sweep_interval() -> Duration {
    SweepConfig::default().interval
}

fn default_sweep_grace() -> Duration {
    SweepConfig::default().grace
}

impl From<&SweepSection> for SweepConfig {
    fn from(section: &SweepSection) -> Self {
        SweepConfig::new()
            .with_interval(section.interval)
            .with_grace(section.grace)
    }
}

/// Where output commands go
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "sink", rename_all = "snake_case")]
pub enum DeviceConfig {
    #[default]
    None,
    /// Line-oriented device file, e.g. a serial port
    Line {
        path: PathBuf,
        /// `"bench"` for the stock eight-output board
        #[serde(default)]
        preset: Option<String>,
        /// Output id to pin label; overrides the preset
        #[serde(default)]
        pins: BTreeMap<String, String>,
    },
    /// Relay `led-command` broadcasts to channel subscribers
    Broadcast,
}

impl DeviceConfig {
    pub fn pin_map(&self) -> Result<PinMap, ConfigError> {
        let DeviceConfig::Line { preset, pins, .. } = self else {
            return Ok(PinMap::passthrough());
        };
        if pins.is_empty() {
            return Ok(match preset.as_deref() {
                Some("bench") => PinMap::bench_board(),
                _ => PinMap::passthrough(),
            });
        }

        let mut pairs = Vec::with_capacity(pins.len());
        for (output, pin) in pins {
            let id = output
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidPin(output.clone()))?;
            pairs.push((id, pin.clone()));
        }
        Ok(PinMap::from_pairs(pairs))
    }
}

impl ProjectConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Load `lg.toml` from `project_root`; a missing file means defaults
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        Self::parse(&content, &path)
    }
}
