// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::manager::{AcquireOutcome, LeaseManager};
use lg_adapters::{FakeOutputSink, MemoryChannel, MemoryStore};
use lg_core::{ConnectionKey, EventBus, FakeClock, PresencePayload, Resource, SequentialTokenGen};

type TestSweep =
    OrphanSweep<MemoryStore, FakeOutputSink, MemoryChannel, SequentialTokenGen, FakeClock>;

fn g1() -> ResourceId {
    ResourceId::new("G1")
}

fn setup() -> (TestSweep, MemoryChannel, FakeClock, FakeOutputSink) {
    let outputs = FakeOutputSink::new();
    let channel = MemoryChannel::new();
    let clock = FakeClock::new();
    let manager = LeaseManager::new(
        MemoryStore::with_resources([Resource::new("G1", "").with_outputs([1, 2])]),
        SequentialTokenGen::new("t"),
        EventBus::new(),
    );
    let sweep = OrphanSweep::new(
        Reclaimer::new(manager, outputs.clone()),
        channel.clone(),
        clock.clone(),
        SweepConfig::new().with_grace(Duration::from_secs(10)),
    );
    (sweep, channel, clock, outputs)
}

async fn acquire(sweep: &TestSweep) -> HolderToken {
    match sweep.reclaimer.leases().acquire(&g1()).await.unwrap() {
        AcquireOutcome::Acquired { token } => token,
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn config_defaults() {
    let config = SweepConfig::default();
    assert_eq!(config.interval, Duration::from_secs(30));
    assert_eq!(config.grace, Duration::from_secs(10));
}

#[tokio::test]
async fn unbound_lease_is_reclaimed_after_grace() {
    let (sweep, _channel, clock, outputs) = setup();
    acquire(&sweep).await;

    assert!(sweep.tick().await.unwrap().is_empty());
    assert_eq!(sweep.suspect_count(), 1);

    clock.advance(Duration::from_secs(11));
    let reclaimed = sweep.tick().await.unwrap();

    assert_eq!(reclaimed.len(), 1);
    assert!(matches!(reclaimed[0].1, ReclaimOutcome::Reclaimed(_)));
    assert_eq!(outputs.calls().len(), 2);
    assert_eq!(sweep.suspect_count(), 0);
    assert!(!sweep.reclaimer.leases().query(&g1()).await.unwrap().busy);
}

#[tokio::test]
async fn bound_lease_is_left_alone() {
    let (sweep, channel, clock, outputs) = setup();
    let token = acquire(&sweep).await;
    channel
        .track(
            &ConnectionKey::new("conn-1"),
            PresencePayload::bound(g1(), token),
        )
        .await
        .unwrap();

    clock.advance(Duration::from_secs(60));
    assert!(sweep.tick().await.unwrap().is_empty());
    assert_eq!(sweep.suspect_count(), 0);
    assert!(outputs.calls().is_empty());
}

#[tokio::test]
async fn binding_within_grace_clears_suspicion() {
    let (sweep, channel, clock, _outputs) = setup();
    let token = acquire(&sweep).await;
    sweep.tick().await.unwrap();
    assert_eq!(sweep.suspect_count(), 1);

    clock.advance(Duration::from_secs(5));
    channel
        .track(
            &ConnectionKey::new("conn-1"),
            PresencePayload::bound(g1(), token),
        )
        .await
        .unwrap();
    clock.advance(Duration::from_secs(10));

    assert!(sweep.tick().await.unwrap().is_empty());
    assert_eq!(sweep.suspect_count(), 0);
}

#[tokio::test]
async fn new_holder_restarts_grace() {
    let (sweep, _channel, clock, _outputs) = setup();
    acquire(&sweep).await;
    sweep.tick().await.unwrap();

    clock.advance(Duration::from_secs(8));
    sweep.reclaimer.leases().release(&g1()).await.unwrap();
    acquire(&sweep).await;
    sweep.tick().await.unwrap();

    clock.advance(Duration::from_secs(5));
    assert!(sweep.tick().await.unwrap().is_empty());
    assert!(sweep.reclaimer.leases().query(&g1()).await.unwrap().busy);
}
