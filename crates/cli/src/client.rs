// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lg_core::{HolderToken, LeaseSnapshot, OutputCommand, OutputMeta, ResourceId};
use lg_daemon::protocol::{self, ProtocolError};
use lg_daemon::{
    Config, LeaseSummary, LifecycleError, ReclaimSummary, Request, Response, CONFIG_FILE,
    STARTUP_ERROR_PREFIX, STARTUP_MARKER_PREFIX,
};
use lg_engine::{AcquireOutcome, LeaseClient};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for one request/response exchange
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("LG_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("LG_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("LG_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("LG_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("Connection to daemon lost")]
    ConnectionLost,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine project root")]
    NoProjectRoot,

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl From<LifecycleError> for ClientError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::NoStateDir => ClientError::NoStateDir,
            LifecycleError::ProjectNotFound(..) => ClientError::NoProjectRoot,
            other => ClientError::DaemonStartFailed(other.to_string()),
        }
    }
}

/// Result of an unlock or forced release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimResult {
    Reclaimed(ReclaimSummary),
    /// The lease moved on to another holder first
    Stale,
    NotLocked,
    NotFound,
}

/// Daemon status counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub resources: usize,
    pub busy: usize,
    pub online: usize,
}

/// Daemon client; every request uses a fresh connection
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to daemon, auto-starting if not running
    pub async fn connect_or_start(project_root: &Path) -> Result<Self, ClientError> {
        let config = Config::for_project(project_root)?;

        // Restart a daemon left over from another version
        if let Ok(daemon_version) = std::fs::read_to_string(&config.version_path) {
            if daemon_version.trim() != env!("CARGO_PKG_VERSION") {
                let _ = daemon_stop(&config).await;
            }
        }

        match Self::connect(&config) {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background(&config.project_root)?;
                Self::connect_with_retry(&config, timeout_connect(), child).await
            }
            Err(e) => Err(wrap_with_startup_error(e, &config)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect(config: &Config) -> Result<Self, ClientError> {
        if !config.socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self::at(config.socket_path.clone()))
    }

    /// Client for a known socket path
    pub fn at(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    async fn connect_with_retry(
        config: &Config,
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // An early exit means startup failed; the reason is in the log
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(config) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    tokio::time::sleep(poll_interval()).await;
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect(config) {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => tokio::time::sleep(poll_interval()).await,
                Err(e) => return Err(wrap_with_startup_error(e, config)),
            }
        }

        Err(wrap_with_startup_error(
            ClientError::DaemonStartTimeout,
            config,
        ))
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        exchange(&mut stream, &request, timeout_ipc()).await
    }

    /// Open a long-lived connection that can carry a lease binding
    pub async fn attach(&self) -> Result<AttachedClient, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        Ok(AttachedClient {
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Open a connection that receives every channel broadcast
    pub async fn subscribe(&self) -> Result<BroadcastStream, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        match exchange(&mut stream, &Request::Subscribe, timeout_ipc()).await? {
            Response::Subscribed => Ok(BroadcastStream { stream }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn acquire(&self, resource: &ResourceId) -> Result<AcquireOutcome, ClientError> {
        into_acquire(
            self.send(Request::Acquire {
                resource: resource.clone(),
            })
            .await?,
        )
    }

    /// Release unconditionally; `false` if the resource does not exist
    pub async fn release(&self, resource: &ResourceId) -> Result<bool, ClientError> {
        match self
            .send(Request::Release {
                resource: resource.clone(),
            })
            .await?
        {
            Response::Released { .. } => Ok(true),
            Response::NotFound { .. } => Ok(false),
            other => Err(unexpected(other)),
        }
    }

    pub async fn unlock(
        &self,
        resource: &ResourceId,
        token: &HolderToken,
    ) -> Result<ReclaimResult, ClientError> {
        into_reclaim(
            self.send(Request::Unlock {
                resource: resource.clone(),
                token: token.clone(),
            })
            .await?,
        )
    }

    pub async fn query(&self, resource: &ResourceId) -> Result<LeaseSnapshot, ClientError> {
        match self
            .send(Request::Query {
                resource: resource.clone(),
            })
            .await?
        {
            Response::Lease { lease } => Ok(lease),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list(&self) -> Result<Vec<LeaseSummary>, ClientError> {
        match self.send(Request::List).await? {
            Response::Leases { leases } => Ok(leases),
            other => Err(unexpected(other)),
        }
    }

    pub async fn force_release(&self, resource: &ResourceId) -> Result<ReclaimResult, ClientError> {
        into_reclaim(
            self.send(Request::ForceRelease {
                resource: resource.clone(),
            })
            .await?,
        )
    }

    pub async fn force_release_all(&self) -> Result<Vec<ReclaimSummary>, ClientError> {
        match self.send(Request::ForceReleaseAll).await? {
            Response::ForcedAll { released } => Ok(released),
            other => Err(unexpected(other)),
        }
    }

    pub async fn send_output(&self, command: OutputCommand) -> Result<(), ClientError> {
        into_ok(self.send(Request::Output { command }).await?)
    }

    /// Display metadata for every configured output
    pub async fn outputs(&self) -> Result<Vec<OutputMeta>, ClientError> {
        match self.send(Request::Outputs).await? {
            Response::Outputs { outputs } => Ok(outputs),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                resources,
                busy,
                online,
            } => Ok(DaemonStatus {
                uptime_secs,
                resources,
                busy,
                online,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon protocol version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: lg_daemon::PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }
}

/// A single connection to the daemon. The connection is this client's
/// presence entry: dropping it while bound reclaims the lease.
///
/// A failed exchange closes the connection, since a late response would
/// otherwise be read as the answer to the next request.
pub struct AttachedClient {
    stream: Mutex<Option<UnixStream>>,
}

impl AttachedClient {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::ConnectionLost)?;
        let result = exchange(stream, &request, timeout_ipc()).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

/// One `Broadcast` relayed by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Broadcast {
    pub event: String,
    pub payload: serde_json::Value,
}

/// A subscribed connection; yields broadcasts until the daemon closes it
pub struct BroadcastStream {
    stream: UnixStream,
}

impl BroadcastStream {
    /// Wait for the next broadcast. `None` once the daemon has closed the
    /// connection.
    pub async fn next(&mut self) -> Result<Option<Broadcast>, ClientError> {
        let bytes = match protocol::read_message(&mut self.stream).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match protocol::decode(&bytes)? {
            Response::Broadcast { event, payload } => Ok(Some(Broadcast { event, payload })),
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl LeaseClient for AttachedClient {
    type Error = ClientError;

    async fn acquire(&self, resource: &ResourceId) -> Result<AcquireOutcome, ClientError> {
        into_acquire(
            self.send(Request::Acquire {
                resource: resource.clone(),
            })
            .await?,
        )
    }

    async fn bind(&self, resource: &ResourceId, token: &HolderToken) -> Result<(), ClientError> {
        into_ok(
            self.send(Request::Bind {
                resource: resource.clone(),
                token: token.clone(),
            })
            .await?,
        )
    }

    async fn unlock(&self, resource: &ResourceId, token: &HolderToken) -> Result<(), ClientError> {
        let result = into_reclaim(
            self.send(Request::Unlock {
                resource: resource.clone(),
                token: token.clone(),
            })
            .await?,
        )?;
        tracing::debug!(%resource, ?result, "unlocked");
        Ok(())
    }

    async fn send_output(&self, command: OutputCommand) -> Result<(), ClientError> {
        into_ok(self.send(Request::Output { command }).await?)
    }
}

/// Write one request and read its response on `stream`
async fn exchange<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    request: &Request,
    timeout: Duration,
) -> Result<Response, ClientError> {
    let data = protocol::encode(request)?;
    tokio::time::timeout(timeout, protocol::write_message(stream, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    let bytes = tokio::time::timeout(timeout, protocol::read_message(stream))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    Ok(protocol::decode(&bytes)?)
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

fn into_ok(response: Response) -> Result<(), ClientError> {
    match response {
        Response::Ok => Ok(()),
        other => Err(unexpected(other)),
    }
}

fn into_acquire(response: Response) -> Result<AcquireOutcome, ClientError> {
    match response {
        Response::Acquired { token, .. } => Ok(AcquireOutcome::Acquired { token }),
        Response::Locked { .. } => Ok(AcquireOutcome::Locked),
        Response::NotFound { .. } => Ok(AcquireOutcome::NotFound),
        other => Err(unexpected(other)),
    }
}

fn into_reclaim(response: Response) -> Result<ReclaimResult, ClientError> {
    match response {
        Response::Reclaimed { summary } => Ok(ReclaimResult::Reclaimed(summary)),
        Response::Stale { .. } => Ok(ReclaimResult::Stale),
        Response::NotLocked { .. } => Ok(ReclaimResult::NotLocked),
        Response::NotFound { .. } => Ok(ReclaimResult::NotFound),
        other => Err(unexpected(other)),
    }
}

/// Start the daemon in the background, returning the child process handle
fn start_daemon_background(project_root: &Path) -> Result<std::process::Child, ClientError> {
    let lgd_path = find_lgd_binary();

    Command::new(&lgd_path)
        .arg(project_root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(config: &Config) -> Result<bool, ClientError> {
    let client = match DaemonClient::connect(config) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            cleanup_stale_pid(config);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid(config) {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }

        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    cleanup_stale_pid(config);
    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the lgd binary
pub fn find_lgd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("LG_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Running from cargo (development)
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let dev_path = PathBuf::from(manifest_dir)
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.join("target/debug/lgd"));
        if let Some(path) = dev_path.filter(|p| p.exists()) {
            return path;
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(sibling) = exe.parent().map(|dir| dir.join("lgd")) {
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("lgd")
}

/// Find the project root by walking up from current directory
///
/// Checks LG_PROJECT_ROOT first, then walks up looking for `lg.toml`.
pub fn find_project_root() -> Result<PathBuf, ClientError> {
    if let Ok(root) = std::env::var("LG_PROJECT_ROOT") {
        return Ok(PathBuf::from(root));
    }

    let cwd = std::env::current_dir().map_err(|_| ClientError::NoProjectRoot)?;
    let mut current = cwd.clone();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            // No lg.toml found, use current directory as project root
            return Ok(cwd);
        }
    }
}

/// Remove an orphaned PID file left by a daemon that is gone
fn cleanup_stale_pid(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid(config: &Config) -> Option<u32> {
    std::fs::read_to_string(&config.lock_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // kill -0 checks for the process without sending a signal
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Force kill a daemon process
pub fn force_kill_daemon(pid: u32) -> bool {
    Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Errors recorded since the daemon's last startup marker, if any
pub fn read_startup_error(config: &Config) -> Option<String> {
    let content = std::fs::read_to_string(&config.log_path).ok()?;

    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let errors: Vec<&str> = content[start_pos..]
        .lines()
        .filter_map(|line| line.split_once(STARTUP_ERROR_PREFIX))
        .map(|(_, message)| message)
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

/// Prefer the daemon's own startup error over a generic connect failure
fn wrap_with_startup_error(err: ClientError, config: &Config) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error(config) {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
