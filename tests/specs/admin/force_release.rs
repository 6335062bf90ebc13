//! Administrative override specs

use crate::prelude::*;
use lg_core::{OutputId, ResourceId};

#[tokio::test]
async fn force_release_on_free_resource_sends_nothing() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut conn = daemon.connect().await;

    assert_eq!(
        conn.call(Request::ForceRelease { resource: g1() }).await,
        Response::NotLocked { resource: g1() }
    );
    assert!(project.device_lines().is_empty());
    daemon.stop().await;
}

#[tokio::test]
async fn force_release_frees_even_when_every_output_fails() {
    // Only output 9 has a pin, so the off commands for 1, 2 and 3 all fail
    let project = Project::with_config("[device.pins]\n\"9\" = \"A9\"\n");
    let daemon = project.start().await;
    let mut holder = daemon.connect().await;
    holder.hold(&g1()).await;
    let mut admin = daemon.connect().await;

    let response = admin.call(Request::ForceRelease { resource: g1() }).await;

    let Response::Reclaimed { summary } = response else {
        panic!("expected Reclaimed, got {:?}", response);
    };
    // Every off command was attempted even though none landed
    assert_eq!(summary.leds_off, 3);
    assert_eq!(summary.failed, [OutputId(1), OutputId(2), OutputId(3)]);
    assert!(!admin.query(&g1()).await.busy);
    daemon.stop().await;
}

#[tokio::test]
async fn force_release_all_frees_every_held_lease() {
    let project = Project::new();
    let daemon = project.start().await;
    let mut a = daemon.connect().await;
    let mut b = daemon.connect().await;
    a.hold(&g1()).await;
    b.hold(&ResourceId::new("G2")).await;
    let mut admin = daemon.connect().await;

    let response = admin.call(Request::ForceReleaseAll).await;

    let Response::ForcedAll { released } = response else {
        panic!("expected ForcedAll, got {:?}", response);
    };
    assert_eq!(released.len(), 2);
    assert_eq!(released.iter().map(|s| s.leds_off).sum::<usize>(), 4);
    assert_eq!(project.device_lines().len(), 4);

    let Response::Leases { leases } = admin.call(Request::List).await else {
        panic!("expected Leases");
    };
    assert!(leases.iter().all(|lease| !lease.busy));
    daemon.stop().await;
}
