// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for daemon client behavior.

use super::*;
use lg_core::{OutputId, Resource};
use lg_daemon::{startup, ProjectConfig, ShutdownHandle};
use lg_engine::{run_with_lease, standard_routine, SessionOutcome};
use std::fs;
use tempfile::{tempdir, TempDir};
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn config(dir: &TempDir) -> Config {
    let project = dir.path().join("project");
    fs::create_dir_all(&project).unwrap();
    Config::with_dirs(&project, &dir.path().join("state"), &dir.path().join("sock")).unwrap()
}

struct Daemon {
    _dir: TempDir,
    client: DaemonClient,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<(), LifecycleError>>,
}

impl Daemon {
    async fn start() -> Self {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let project = ProjectConfig {
            resources: vec![Resource::new("G1", "Planets").with_outputs([1, 2, 3])],
            ..ProjectConfig::default()
        };
        let daemon = startup(&config, &project).await.unwrap();
        let shutdown = daemon.shutdown_handle();
        Self {
            _dir: dir,
            client: DaemonClient::connect(&config).unwrap(),
            shutdown,
            task: tokio::spawn(lg_daemon::run(daemon)),
        }
    }

    async fn stop(self) {
        self.shutdown.request();
        self.task.await.unwrap().unwrap();
    }
}

fn g1() -> ResourceId {
    ResourceId::new("G1")
}

/// Verify that connect() does not delete state files when daemon is not running.
///
/// A pid file written mid-startup must survive connect polling.
#[test]
fn connect_does_not_delete_pid_file() {
    let dir = tempdir().unwrap();
    let config = config(&dir);

    fs::create_dir_all(config.lock_path.parent().unwrap()).unwrap();
    fs::write(&config.lock_path, "12345\n").unwrap();

    let result = DaemonClient::connect(&config);
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));

    assert!(config.lock_path.exists(), "connect() must not delete pid file");
    assert_eq!(read_daemon_pid(&config), Some(12345));
}

#[test]
fn startup_error_is_read_from_last_attempt() {
    let dir = tempdir().unwrap();
    let config = config(&dir);
    fs::create_dir_all(config.log_path.parent().unwrap()).unwrap();
    let log = format!(
        "{p}1) ---\n{e}old failure\n{p}2) ---\nsome info line\n{e}Config error: bad toml\n",
        p = STARTUP_MARKER_PREFIX,
        e = STARTUP_ERROR_PREFIX,
    );
    fs::write(&config.log_path, log).unwrap();

    assert_eq!(
        read_startup_error(&config).as_deref(),
        Some("Config error: bad toml")
    );
}

#[test]
fn clean_startup_reports_no_error() {
    let dir = tempdir().unwrap();
    let config = config(&dir);
    fs::create_dir_all(config.log_path.parent().unwrap()).unwrap();
    fs::write(
        &config.log_path,
        format!("{}7) ---\nstarted\n", STARTUP_MARKER_PREFIX),
    )
    .unwrap();

    assert_eq!(read_startup_error(&config), None);
}

#[tokio::test]
async fn one_shot_requests_map_to_outcomes() {
    let daemon = Daemon::start().await;
    let client = &daemon.client;

    let token = match client.acquire(&g1()).await.unwrap() {
        AcquireOutcome::Acquired { token } => token,
        other => panic!("expected acquired, got {:?}", other),
    };
    assert_eq!(
        client.acquire(&g1()).await.unwrap(),
        AcquireOutcome::Locked
    );
    assert_eq!(
        client.acquire(&ResourceId::new("G9")).await.unwrap(),
        AcquireOutcome::NotFound
    );

    match client.unlock(&g1(), &token).await.unwrap() {
        ReclaimResult::Reclaimed(summary) => assert_eq!(summary.leds_off, 3),
        other => panic!("expected reclaimed, got {:?}", other),
    }
    assert_eq!(
        client.unlock(&g1(), &token).await.unwrap(),
        ReclaimResult::Stale
    );
    assert_eq!(
        client.force_release(&g1()).await.unwrap(),
        ReclaimResult::NotLocked
    );
    assert!(!client.query(&g1()).await.unwrap().busy);
    assert_eq!(client.hello().await.unwrap(), lg_daemon::PROTOCOL_VERSION);

    daemon.stop().await;
}

#[tokio::test]
async fn attached_session_runs_routine_and_unlocks() {
    let daemon = Daemon::start().await;
    let attached = daemon.client.attach().await.unwrap();
    let (_abort_tx, abort_rx) = watch::channel(false);
    let outputs = [OutputId(1), OutputId(2), OutputId(3)];
    let steps = standard_routine(&outputs, Duration::from_millis(1));

    let outcome = run_with_lease(&attached, &g1(), &steps, abort_rx, None)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            steps: steps.len()
        }
    );
    assert!(!daemon.client.query(&g1()).await.unwrap().busy);

    drop(attached);
    daemon.stop().await;
}

#[tokio::test]
async fn dropping_bound_connection_frees_the_lease() {
    let daemon = Daemon::start().await;
    let attached = daemon.client.attach().await.unwrap();

    let token = match attached.acquire(&g1()).await.unwrap() {
        AcquireOutcome::Acquired { token } => token,
        other => panic!("expected acquired, got {:?}", other),
    };
    attached.bind(&g1(), &token).await.unwrap();
    assert!(daemon.client.query(&g1()).await.unwrap().busy);

    drop(attached);

    let start = Instant::now();
    while daemon.client.query(&g1()).await.unwrap().busy {
        assert!(start.elapsed() < Duration::from_secs(5), "lease never reclaimed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    daemon.stop().await;
}

#[tokio::test]
async fn subscription_yields_broadcasts_until_shutdown() {
    let daemon = Daemon::start().await;
    let mut stream = daemon.client.subscribe().await.unwrap();

    daemon.client.acquire(&g1()).await.unwrap();
    let broadcast = tokio::time::timeout(Duration::from_secs(3), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(broadcast.event, "locks_update");
    assert_eq!(broadcast.payload["event"], "lease:acquired");

    daemon.stop().await;
    let mut rest = Vec::new();
    while let Some(broadcast) = stream.next().await.unwrap() {
        rest.push(broadcast);
    }
    assert!(rest.iter().all(|b| b.event == "locks_update"));
}

#[tokio::test]
async fn outputs_default_to_empty() {
    let daemon = Daemon::start().await;

    assert!(daemon.client.outputs().await.unwrap().is_empty());

    daemon.stop().await;
}

#[tokio::test]
async fn attached_client_drops_connection_after_failed_exchange() {
    let daemon = Daemon::start().await;
    let attached = daemon.client.attach().await.unwrap();
    attached.acquire(&g1()).await.unwrap();

    daemon.stop().await;

    assert!(attached.acquire(&g1()).await.is_err());
    assert!(matches!(
        attached.acquire(&g1()).await,
        Err(ClientError::ConnectionLost)
    ));
}
