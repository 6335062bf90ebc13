// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ON/OFF output commands and their `ON:<n>` text form

use crate::resource::OutputId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Target level of an output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputLevel {
    On,
    Off,
}

impl OutputLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputLevel::On => "ON",
            OutputLevel::Off => "OFF",
        }
    }
}

impl std::fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputLevel {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON" => Ok(OutputLevel::On),
            "OFF" => Ok(OutputLevel::Off),
            _ => Err(CommandParseError::UnknownLevel(s.to_string())),
        }
    }
}

/// Set one output to a level. Idempotent at the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputCommand {
    pub output: OutputId,
    pub level: OutputLevel,
}

impl OutputCommand {
    pub fn on(output: OutputId) -> Self {
        Self {
            output,
            level: OutputLevel::On,
        }
    }

    pub fn off(output: OutputId) -> Self {
        Self {
            output,
            level: OutputLevel::Off,
        }
    }
}

impl std::fmt::Display for OutputCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.level, self.output)
    }
}

/// Errors parsing the `LEVEL:output` form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("missing ':' in command {0:?}")]
    MissingSeparator(String),
    #[error("unknown level {0:?}, expected ON or OFF")]
    UnknownLevel(String),
    #[error("invalid output id {0:?}")]
    InvalidOutput(String),
}

impl FromStr for OutputCommand {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (level, output) = s
            .split_once(':')
            .ok_or_else(|| CommandParseError::MissingSeparator(s.to_string()))?;
        let level = level.parse()?;
        let output = output
            .parse()
            .map_err(|_| CommandParseError::InvalidOutput(output.to_string()))?;
        Ok(Self { output, level })
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
