//! Daemon lifecycle specs
//!
//! Verify startup, shutdown and restart behavior.

use crate::prelude::*;

#[tokio::test]
async fn hello_reports_protocol_version() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;

    assert_eq!(
        conn.call(Request::Hello {
            version: lg_daemon::PROTOCOL_VERSION.to_string(),
        })
        .await,
        Response::Hello {
            version: lg_daemon::PROTOCOL_VERSION.to_string(),
        }
    );
    daemon.stop().await;
}

#[tokio::test]
async fn status_counts_resources_and_connections() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut holder = daemon.connect().await;
    holder.hold(&g1()).await;
    let mut conn = daemon.connect().await;

    let Response::Status {
        resources,
        busy,
        online,
        ..
    } = conn.call(Request::Status).await
    else {
        panic!("expected Status");
    };
    assert_eq!((resources, busy, online), (2, 1, 2));
    daemon.stop().await;
}

#[tokio::test]
async fn shutdown_removes_socket_and_pid_file() {
    let project = Project::new();
    let daemon = project.start().await;
    assert!(project.config().socket_path.exists());

    daemon.stop().await;

    assert!(!project.config().socket_path.exists());
    assert!(!project.config().lock_path.exists());
}

#[tokio::test]
async fn lease_held_across_restart_is_swept() {
    let project = Project::with_config(FAST_SWEEP);
    let daemon = project.start().await;
    let mut caller = daemon.connect().await;
    // Unbound, and stopped well inside the grace period
    let token = caller.acquire_token(&g1()).await;
    daemon.stop().await;

    let daemon = project.start().await;
    let mut conn = daemon.connect().await;
    assert_eq!(conn.query(&g1()).await.holder, Some(token));

    conn.wait_until_free(&g1()).await;
    daemon.stop().await;
}
