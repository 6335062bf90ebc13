//! Orphan sweep specs
//!
//! A lease nobody is bound to is reclaimed once the grace period passes.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn unbound_lease_is_swept_after_grace() {
    let project = Project::with_config(FAST_SWEEP);
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;
    conn.acquire_token(&g1()).await;

    conn.wait_until_free(&g1()).await;

    assert_eq!(
        project.wait_for_device_lines(3).await,
        ["OFF:1", "OFF:2", "OFF:3"]
    );
    daemon.stop().await;
}

#[tokio::test]
async fn bound_lease_survives_the_sweep() {
    let project = Project::with_config(FAST_SWEEP);
    let daemon = project.start().await;
    let mut holder = daemon.connect().await;
    let token = holder.hold(&g1()).await;

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    assert_eq!(holder.query(&g1()).await.holder, Some(token));
    assert!(project.device_lines().is_empty());
    daemon.stop().await;
}
