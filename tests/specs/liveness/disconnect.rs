//! Disconnect specs
//!
//! A holder whose connection goes away loses the lease; a leave carrying an
//! old token does nothing.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn holder_disconnect_reclaims_and_frees() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut watcher = daemon.connect().await;
    let mut holder = daemon.connect().await;
    let token = holder.hold(&g1()).await;

    let mut rival = daemon.connect().await;
    assert_eq!(
        rival.acquire(&g1()).await,
        Response::Locked { resource: g1() }
    );

    drop(holder);

    watcher.wait_until_free(&g1()).await;
    assert_eq!(
        project.wait_for_device_lines(3).await,
        ["OFF:1", "OFF:2", "OFF:3"]
    );
    let next = rival.acquire_token(&g1()).await;
    assert_ne!(next, token);
    daemon.stop().await;
}

#[tokio::test]
async fn stale_leave_does_not_reclaim_new_holder() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut admin = daemon.connect().await;
    let mut first = daemon.connect().await;
    first.hold(&g1()).await;

    // The first holder is overridden but its connection stays bound to the old token
    let forced = admin.call(Request::ForceRelease { resource: g1() }).await;
    assert!(matches!(forced, Response::Reclaimed { .. }));
    let mut second = daemon.connect().await;
    let current = second.hold(&g1()).await;
    let lines_before = project.device_lines().len();

    drop(first);
    admin.wait_for_online(2).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let lease = admin.query(&g1()).await;
    assert!(lease.busy);
    assert_eq!(lease.holder, Some(current));
    assert_eq!(project.device_lines().len(), lines_before);
    daemon.stop().await;
}

#[tokio::test]
async fn unbound_disconnect_keeps_the_lease() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut watcher = daemon.connect().await;
    let mut caller = daemon.connect().await;
    let token = caller.acquire_token(&g1()).await;

    drop(caller);
    watcher.wait_for_online(1).await;

    assert_eq!(watcher.query(&g1()).await.holder, Some(token));
    daemon.stop().await;
}
