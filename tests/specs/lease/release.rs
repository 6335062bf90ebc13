//! Release and unlock specs

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn release_twice_never_errors() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;
    conn.acquire_token(&g1()).await;

    for _ in 0..2 {
        assert_eq!(
            conn.call(Request::Release { resource: g1() }).await,
            Response::Released { resource: g1() }
        );
        assert!(!conn.query(&g1()).await.busy);
    }
    daemon.stop().await;
}

#[tokio::test]
async fn unlock_switches_outputs_off_in_order() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;
    let token = conn.hold(&g1()).await;

    let response = conn
        .call(Request::Unlock {
            resource: g1(),
            token,
        })
        .await;

    let Response::Reclaimed { summary } = response else {
        panic!("expected Reclaimed, got {:?}", response);
    };
    assert_eq!(summary.leds_off, 3);
    assert!(summary.failed.is_empty());
    assert_eq!(project.device_lines(), ["OFF:1", "OFF:2", "OFF:3"]);
    assert!(!conn.query(&g1()).await.busy);
    daemon.stop().await;
}

#[tokio::test]
async fn unlock_with_old_token_leaves_new_holder_alone() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;
    let old = conn.acquire_token(&g1()).await;
    conn.call(Request::Release { resource: g1() }).await;
    let current = conn.acquire_token(&g1()).await;

    assert_eq!(
        conn.call(Request::Unlock {
            resource: g1(),
            token: old,
        })
        .await,
        Response::Stale { resource: g1() }
    );
    assert_eq!(conn.query(&g1()).await.holder, Some(current));
    assert!(project.device_lines().is_empty());
    daemon.stop().await;
}

#[tokio::test]
async fn output_commands_reach_the_device() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;

    let response = conn
        .call(Request::Output {
            command: "ON:2".parse().unwrap(),
        })
        .await;

    assert_eq!(response, Response::Ok);
    assert_eq!(project.device_lines(), ["ON:2"]);
    daemon.stop().await;
}
