// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use lg_adapters::{
    LivenessChannel, MemoryChannel, RecordStore, StoreError, TimedChannel, TimedOutputSink,
    TimedRecordStore, TracedOutputSink, TracedRecordStore, WalStore,
};
use lg_core::{SystemClock, UuidTokenGen};
use lg_engine::{LeaseError, Leasing, LeasingConfig, LeasingDeps};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::{ConfigError, ProjectConfig};
use crate::server::ServerContext;
use crate::sink::{DeviceSink, DeviceSinkError};

pub type DaemonStore = TimedRecordStore<TracedRecordStore<WalStore>>;
pub type DaemonOutputs = TimedOutputSink<TracedOutputSink<DeviceSink<MemoryChannel>>>;
pub type DaemonChannel = TimedChannel<MemoryChannel>;

/// Lease service with the daemon's concrete adapters
pub type DaemonLeasing =
    Leasing<DaemonStore, DaemonOutputs, DaemonChannel, UuidTokenGen, SystemClock>;

/// Daemon path configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory, where `lg.toml` lives
    pub project_root: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the lease record log
    pub wal_path: PathBuf,
}

impl Config {
    /// Create config for a project
    pub fn for_project(project_root: &Path) -> Result<Self, LifecycleError> {
        Self::with_dirs(project_root, &state_dir()?, &socket_dir())
    }

    /// Create config with explicit state and socket directories
    pub fn with_dirs(
        project_root: &Path,
        state_root: &Path,
        socket_dir: &Path,
    ) -> Result<Self, LifecycleError> {
        let canonical = project_root
            .canonicalize()
            .map_err(|e| LifecycleError::ProjectNotFound(project_root.to_path_buf(), e))?;

        let hash = project_hash(&canonical);
        let state_dir = state_root.join("projects").join(&hash);

        Ok(Self {
            project_root: canonical,
            socket_path: socket_dir.join(format!("{}.sock", hash)),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("leases.wal"),
        })
    }
}

/// Requests a graceful shutdown; clones share the same signal
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn request(&self) {
        let _ = self.0.send(true);
    }

    /// Flips once shutdown is requested
    pub fn signal(&self) -> watch::Receiver<bool> {
        self.0.subscribe()
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    pub leasing: Arc<DaemonLeasing>,
    /// Liveness monitor, orphan sweep and lease relay
    background: JoinSet<()>,
    shutdown: ShutdownHandle,
    /// When daemon started
    pub start_time: Instant,
}

impl DaemonState {
    /// Shared state handed to every connection
    pub fn context(&self) -> ServerContext {
        ServerContext::new(
            Arc::clone(&self.leasing),
            self.start_time,
            self.shutdown.clone(),
        )
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop the monitor, sweep and relay
        self.shutdown.request();
        while let Some(joined) = self.background.join_next().await {
            if let Err(e) = joined {
                warn!("Background task failed: {}", e);
            }
        }

        // 2. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 3. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Remove version file
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // 5. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Project not found at {0}: {1}")]
    ProjectNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output device error: {0}")]
    Device(#[from] DeviceSinkError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Lease service error: {0}")]
    Lease(#[from] LeaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(
    config: &Config,
    project: &ProjectConfig,
) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config, project).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(
    config: &Config,
    project: &ProjectConfig,
) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // Write version file
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Set up adapters (wrapped with tracing and call timeouts)
    let timeouts = &project.timeouts;
    let store = TimedRecordStore::new(
        TracedRecordStore::new(WalStore::open(&config.wal_path)?),
        timeouts.store,
    );
    let channel = MemoryChannel::new();
    let sink = DeviceSink::open(&project.device, channel.clone(), timeouts.channel).await?;
    let outputs = TimedOutputSink::new(TracedOutputSink::new(sink), timeouts.channel);

    let leasing = Leasing::new(
        LeasingDeps {
            store,
            outputs,
            channel: TimedChannel::new(channel, timeouts.channel),
        },
        UuidTokenGen,
        SystemClock,
        LeasingConfig {
            subscribe_timeout: timeouts.channel,
            sweep: (&project.sweep).into(),
        },
    );

    // 4. Seed resources and output metadata from lg.toml
    let seeded = leasing.seed(project.resources.iter().cloned()).await?;
    for meta in &project.outputs {
        leasing
            .manager()
            .store()
            .upsert_output_meta(meta.clone())
            .await?;
    }
    info!("Loaded {} resources from config", seeded);

    // 5. Reconcile with reality
    reconcile_state(&leasing).await?;

    // 6. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 7. Start monitor, sweep and relay
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = leasing.spawn_background(shutdown_rx).await?;

    info!(
        "Daemon started for project: {}",
        config.project_root.display()
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        leasing: Arc::new(leasing),
        background,
        shutdown: ShutdownHandle(Arc::new(shutdown_tx)),
        start_time: Instant::now(),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove socket if we created it
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    // Remove version file
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }

    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Leases held across a restart have no live presence; the sweep reclaims
/// them once the grace period passes.
async fn reconcile_state(leasing: &DaemonLeasing) -> Result<(), LifecycleError> {
    let held: Vec<_> = leasing
        .manager()
        .store()
        .leases()
        .await?
        .into_iter()
        .filter(|lease| !lease.is_free())
        .collect();

    if !held.is_empty() {
        warn!(
            "Found {} leases held from previous run (reclaimed after {:?} without a holder)",
            held.len(),
            leasing.config().sweep.grace
        );
        for lease in &held {
            warn!("  - {}", lease.resource);
        }
    }

    let online = leasing.channel().presence().await.map_err(LeaseError::from)?;
    tracing::debug!(online = online.len(), "presence at startup");
    Ok(())
}

/// Get the state directory for lg
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("lg"));
    }

    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/lg"))
}

/// Get the socket directory for lg
///
/// Uses /tmp/lg by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with LG_SOCKET_DIR for testing.
fn socket_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LG_SOCKET_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from("/tmp/lg")
}

/// Compute project hash for unique daemon directory
pub fn project_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // Take first 16 chars of hex digest
    hex_encode(&result[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Startup marker prefix written to log before anything else.
/// CLI uses this to find where the current startup attempt begins.
/// Full format: "--- lgd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- lgd: starting (pid: ";

/// Prefix of the line recording a failed startup
pub const STARTUP_ERROR_PREFIX: &str = "ERROR Failed to start daemon: ";

/// Write startup marker to log file (appends to existing log)
pub fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This ensures the error is visible to the CLI even if the process exits quickly.
pub fn write_startup_error(config: &Config, error: &dyn std::fmt::Display) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "{}{}", STARTUP_ERROR_PREFIX, error);
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
