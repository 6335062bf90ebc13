// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.
//!
//! Every connection is a presence entry on the liveness channel for as long
//! as it stays open. A connection that binds a lease token and then drops
//! has its lease reclaimed by the liveness monitor. A connection that
//! subscribes receives channel broadcasts until it closes.

use std::sync::Arc;
use std::time::Instant;

use lg_adapters::{subscribe_bounded, ChannelEvent, LivenessChannel};
use lg_core::{ConnectionKey, HolderToken, PresencePayload, ReclaimReason, ResourceId};
use lg_engine::{
    AcquireOutcome, ForceReleaseOutcome, LeaseError, ReclaimOutcome, ReleaseOutcome,
};
use tokio::io::AsyncReadExt;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::net::UnixStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{DaemonLeasing, DaemonState, LifecycleError, ShutdownHandle};
use crate::protocol::{
    self, LeaseSummary, ProtocolError, ReclaimSummary, Request, Response, DEFAULT_TIMEOUT,
    PROTOCOL_VERSION,
};

/// Shown to clients when the lease service fails unexpectedly
pub const RETRY_MESSAGE: &str = "lease service unavailable, please try again";

/// State shared by all connections
#[derive(Clone)]
pub struct ServerContext {
    leasing: Arc<DaemonLeasing>,
    start_time: Instant,
    shutdown: ShutdownHandle,
}

impl ServerContext {
    pub fn new(leasing: Arc<DaemonLeasing>, start_time: Instant, shutdown: ShutdownHandle) -> Self {
        Self {
            leasing,
            start_time,
            shutdown,
        }
    }
}

/// Serve until shutdown is requested, then shut the daemon down.
///
/// A request made before this is called still counts.
pub async fn run(daemon: DaemonState) -> Result<(), LifecycleError> {
    let shutdown = daemon.shutdown_handle().signal();
    info!(
        "Daemon ready, listening on {}",
        daemon.config.socket_path.display()
    );
    serve(&daemon.listener, daemon.context(), shutdown).await;
    daemon.shutdown().await
}

/// Accept connections until shutdown, then wait for open ones to finish
pub async fn serve(
    listener: &UnixListener,
    ctx: ServerContext,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, _)) => {
                    let ctx = ctx.clone();
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(&ctx, stream, shutdown).await {
                            error!("Error handling connection: {}", e);
                        }
                    });
                }
                Err(e) => error!("Error accepting connection: {}", e),
            },
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
            // Reap finished connections so the set does not grow
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
    while connections.join_next().await.is_some() {}
}

/// Handle a single client connection
pub async fn handle_connection(
    ctx: &ServerContext,
    stream: UnixStream,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let key = ConnectionKey::new(uuid::Uuid::new_v4().to_string());
    let channel = ctx.leasing.channel();
    if let Err(e) = channel.track(&key, PresencePayload::empty()).await {
        warn!(%key, "Failed to track connection presence: {}", e);
    }

    let result = serve_requests(ctx, &key, stream, shutdown).await;

    if let Err(e) = channel.untrack(&key).await {
        warn!(%key, "Failed to untrack connection presence: {}", e);
    }
    result
}

async fn serve_requests(
    ctx: &ServerContext,
    key: &ConnectionKey,
    stream: UnixStream,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();
    let mut bound = None;

    // First request is bounded; afterwards an idle connection is a live holder
    let mut request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    loop {
        debug!("Received request: {:?}", request);
        if request == Request::Subscribe {
            return stream_broadcasts(ctx, key, &mut reader, &mut writer, &mut shutdown).await;
        }
        let response = handle_request(ctx, key, &mut bound, request).await;
        debug!("Sending response: {:?}", response);

        protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

        request = tokio::select! {
            bytes = protocol::read_message(&mut reader) => match bytes {
                Ok(bytes) => protocol::decode(&bytes)?,
                Err(ProtocolError::ConnectionClosed) => {
                    debug!(%key, "Client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            },
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => return Ok(()),
        };
    }
}

/// Forward channel broadcasts to a subscribed connection.
///
/// The connection is receive-only from here; anything the client sends is
/// discarded, and a closed read side ends the stream.
async fn stream_broadcasts(
    ctx: &ServerContext,
    key: &ConnectionKey,
    reader: &mut OwnedReadHalf,
    writer: &mut OwnedWriteHalf,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let channel = ctx.leasing.channel();
    let subscriber = format!("watch-{}", key);
    let mut events = match subscribe_bounded(channel, &subscriber, DEFAULT_TIMEOUT).await {
        Ok(events) => events,
        Err(e) => {
            error!(%key, "Failed to subscribe connection: {}", e);
            let response = Response::Error {
                message: RETRY_MESSAGE.to_string(),
            };
            protocol::write_response(writer, &response, DEFAULT_TIMEOUT).await?;
            return Ok(());
        }
    };
    protocol::write_response(writer, &Response::Subscribed, DEFAULT_TIMEOUT).await?;
    info!(%key, "connection subscribed to broadcasts");

    let mut discard = [0u8; 256];
    let result = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ChannelEvent::Broadcast { event, payload }) => {
                    let response = Response::Broadcast { event, payload };
                    if let Err(e) =
                        protocol::write_response(writer, &response, DEFAULT_TIMEOUT).await
                    {
                        break Err(e.into());
                    }
                }
                Some(ChannelEvent::Presence(_)) => {}
                None => break Ok(()),
            },
            read = reader.read(&mut discard) => match read {
                Ok(0) => {
                    debug!(%key, "Subscriber disconnected");
                    break Ok(());
                }
                Ok(_) => {}
                Err(e) => break Err(ProtocolError::from(e).into()),
            },
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break Ok(()),
        }
    };

    if let Err(e) = channel.unsubscribe(&subscriber).await {
        warn!(%key, "Failed to unsubscribe connection: {}", e);
    }
    result
}

/// Handle a single request and return a response
async fn handle_request(
    ctx: &ServerContext,
    key: &ConnectionKey,
    bound: &mut Option<(ResourceId, HolderToken)>,
    request: Request,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Shutdown => {
            info!("Shutdown requested via IPC");
            ctx.shutdown.request();
            Response::ShuttingDown
        }

        request => match handle_lease_request(ctx, key, bound, request).await {
            Ok(response) => response,
            Err(e) => {
                error!(%key, "Lease request failed: {}", e);
                Response::Error {
                    message: RETRY_MESSAGE.to_string(),
                }
            }
        },
    }
}

async fn handle_lease_request(
    ctx: &ServerContext,
    key: &ConnectionKey,
    bound: &mut Option<(ResourceId, HolderToken)>,
    request: Request,
) -> Result<Response, LeaseError> {
    let leasing = &ctx.leasing;

    Ok(match request {
        Request::Acquire { resource } => match leasing.acquire(&resource).await? {
            AcquireOutcome::Acquired { token } => Response::Acquired { resource, token },
            AcquireOutcome::Locked => Response::Locked { resource },
            AcquireOutcome::NotFound => Response::NotFound { resource },
        },

        Request::Release { resource } => match leasing.release(&resource).await? {
            ReleaseOutcome::NotFound => Response::NotFound { resource },
            ReleaseOutcome::Released { .. } | ReleaseOutcome::AlreadyFree => {
                Response::Released { resource }
            }
        },

        Request::Unlock { resource, token } => {
            let outcome = leasing
                .reclaimer()
                .reclaim_held_by(&resource, &token, ReclaimReason::Unlock)
                .await?;
            if bound.as_ref() == Some(&(resource.clone(), token)) {
                leasing
                    .channel()
                    .track(key, PresencePayload::empty())
                    .await?;
                *bound = None;
            }
            match outcome {
                ReclaimOutcome::Reclaimed(report) => Response::Reclaimed {
                    summary: report.into(),
                },
                ReclaimOutcome::Stale => Response::Stale { resource },
                ReclaimOutcome::NotFound => Response::NotFound { resource },
            }
        }

        Request::Bind { resource, token } => {
            let payload = PresencePayload::bound(resource.clone(), token.clone());
            leasing.channel().track(key, payload).await?;
            info!(%key, %resource, "connection bound to lease");
            *bound = Some((resource, token));
            Response::Ok
        }

        Request::Query { resource } => Response::Lease {
            lease: leasing.query(&resource).await?,
        },

        Request::List => Response::Leases {
            leases: leasing
                .list()
                .await?
                .into_iter()
                .map(|(resource, lease)| LeaseSummary {
                    title: resource.label().to_string(),
                    resource: resource.id,
                    outputs: resource.outputs,
                    busy: lease.busy,
                    holder: lease.holder,
                })
                .collect(),
        },

        Request::ForceRelease { resource } => match leasing.force_release(&resource).await? {
            ForceReleaseOutcome::Released(report) => Response::Reclaimed {
                summary: report.into(),
            },
            ForceReleaseOutcome::NotLocked => Response::NotLocked { resource },
            ForceReleaseOutcome::NotFound => Response::NotFound { resource },
        },

        Request::ForceReleaseAll => Response::ForcedAll {
            released: leasing
                .force_release_all()
                .await?
                .into_iter()
                .filter_map(|(_, outcome)| match outcome {
                    ForceReleaseOutcome::Released(report) => Some(ReclaimSummary::from(report)),
                    _ => None,
                })
                .collect(),
        },

        Request::Output { command } => match leasing.send_output(command).await {
            Ok(()) => Response::Ok,
            Err(LeaseError::Output(e)) => {
                warn!(%command, "Output command failed: {}", e);
                Response::Error {
                    message: format!("output command {} failed: {}", command, e),
                }
            }
            Err(e) => return Err(e),
        },

        Request::Outputs => Response::Outputs {
            outputs: leasing.output_meta().await?,
        },

        Request::Status => {
            let listing = leasing.list().await?;
            let online = leasing.channel().presence().await?.len();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                resources: listing.len(),
                busy: listing.iter().filter(|(_, lease)| lease.busy).count(),
                online,
            }
        }

        // Answered before reaching here
        Request::Ping | Request::Hello { .. } | Request::Shutdown | Request::Subscribe => {
            Response::Ok
        }
    })
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
