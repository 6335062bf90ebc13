// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between `lg` and `lgd`
//!
//! Every message is a 4-byte big-endian length followed by that many bytes
//! of JSON. A connection carries any number of request/response pairs,
//! until it sends `Subscribe`; from then on it only receives `Broadcast`s.

use std::time::Duration;

use lg_core::{
    HolderToken, LeaseSnapshot, OutputCommand, OutputId, OutputMeta, ReclaimReason, ResourceId,
};
use lg_engine::ReclaimReport;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bumped whenever a request or response changes shape
pub const PROTOCOL_VERSION: &str = "2";

/// Default read/write timeout for one message
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest message either side will accept
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello {
        version: String,
    },
    Status,
    Shutdown,

    Acquire {
        resource: ResourceId,
    },
    /// Free the lease whoever holds it
    Release {
        resource: ResourceId,
    },
    /// Switch off and release, if `token` still holds the lease
    Unlock {
        resource: ResourceId,
        token: HolderToken,
    },
    /// Carry `token` in this connection's presence entry
    Bind {
        resource: ResourceId,
        token: HolderToken,
    },
    Query {
        resource: ResourceId,
    },
    List,
    ForceRelease {
        resource: ResourceId,
    },
    ForceReleaseAll,
    Output {
        command: OutputCommand,
    },
    /// Display metadata for every configured output
    Outputs,
    /// Turn this connection into a stream of channel broadcasts
    Subscribe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseSummary {
    pub resource: ResourceId,
    pub title: String,
    pub outputs: Vec<OutputId>,
    pub busy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<HolderToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimSummary {
    pub resource: ResourceId,
    pub reason: ReclaimReason,
    pub leds_off: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<OutputId>,
}

impl From<ReclaimReport> for ReclaimSummary {
    fn from(report: ReclaimReport) -> Self {
        Self {
            resource: report.resource,
            reason: report.reason,
            leds_off: report.leds_off,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Pong,
    Hello {
        version: String,
    },
    ShuttingDown,
    Status {
        uptime_secs: u64,
        resources: usize,
        busy: usize,
        online: usize,
    },

    Acquired {
        resource: ResourceId,
        token: HolderToken,
    },
    /// The resource is currently in use
    Locked {
        resource: ResourceId,
    },
    NotFound {
        resource: ResourceId,
    },
    Released {
        resource: ResourceId,
    },
    /// Unlock or reclaim finished; outputs were switched off
    Reclaimed {
        summary: ReclaimSummary,
    },
    /// The lease moved on before the request arrived
    Stale {
        resource: ResourceId,
    },
    NotLocked {
        resource: ResourceId,
    },
    ForcedAll {
        released: Vec<ReclaimSummary>,
    },
    Lease {
        lease: LeaseSnapshot,
    },
    Leases {
        leases: Vec<LeaseSummary>,
    },
    Outputs {
        outputs: Vec<OutputMeta>,
    },
    /// Broadcasts follow on this connection
    Subscribed,
    /// One channel broadcast, e.g. `locks_update` or `led-command`
    Broadcast {
        event: String,
        payload: serde_json::Value,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("message of {0} bytes exceeds limit")]
    MessageTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize to JSON, without the length prefix
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(ProtocolError::MessageTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write one length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_LEN {
        return Err(ProtocolError::MessageTooLarge(data.len()));
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode a request, waiting at most `timeout`
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Encode and write a response, waiting at most `timeout`
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
