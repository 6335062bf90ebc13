//! Acquire specs
//!
//! Exactly one caller wins a free resource; everyone else sees it in use.

use crate::prelude::*;
use lg_core::ResourceId;
use tokio::task::JoinSet;

#[tokio::test]
async fn acquire_on_free_resource_returns_token() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;

    let token = conn.acquire_token(&g1()).await;

    let lease = conn.query(&g1()).await;
    assert!(lease.busy);
    assert_eq!(lease.holder, Some(token));
    daemon.stop().await;
}

#[tokio::test]
async fn acquire_on_held_resource_is_locked_without_leaking_holder() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut first = daemon.connect().await;
    let mut second = daemon.connect().await;
    first.hold(&g1()).await;

    assert_eq!(
        second.acquire(&g1()).await,
        Response::Locked { resource: g1() }
    );
    daemon.stop().await;
}

#[tokio::test]
async fn acquire_unknown_resource_is_not_found() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;
    let g9 = ResourceId::new("G9");

    assert_eq!(
        conn.acquire(&g9).await,
        Response::NotFound { resource: g9 }
    );
    daemon.stop().await;
}

#[tokio::test]
async fn concurrent_acquires_grant_exactly_one() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut callers = Vec::new();
    for _ in 0..12 {
        callers.push(daemon.connect().await);
    }

    let mut tasks = JoinSet::new();
    for mut conn in callers {
        tasks.spawn(async move {
            let response = conn.acquire(&g1()).await;
            (response, conn)
        });
    }

    let mut acquired = 0;
    let mut locked = 0;
    let mut keep = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (response, conn) = joined.unwrap();
        match response {
            Response::Acquired { .. } => acquired += 1,
            Response::Locked { .. } => locked += 1,
            other => panic!("unexpected response {:?}", other),
        }
        keep.push(conn);
    }

    assert_eq!(acquired, 1);
    assert_eq!(locked, 11);
    daemon.stop().await;
}

#[tokio::test]
async fn successive_acquisitions_never_share_a_token() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;

    let first = conn.acquire_token(&g1()).await;
    conn.call(Request::Release { resource: g1() }).await;
    let second = conn.acquire_token(&g1()).await;

    assert_ne!(first, second);
    daemon.stop().await;
}
