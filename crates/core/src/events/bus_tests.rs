// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::events::EventPattern;
use crate::resource::ResourceId;
use crate::token::HolderToken;

fn acquired(resource: &str) -> Event {
    Event::LeaseAcquired {
        resource: ResourceId::new(resource),
        holder: HolderToken::new("t-1"),
    }
}

#[tokio::test]
async fn publish_to_matching_subscribers() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe(Subscription::new("leases", vec![EventPattern::new("lease:*")]));

    bus.publish(acquired("G1"));

    let event = rx.try_recv().unwrap();
    assert_eq!(event, acquired("G1"));
}

#[tokio::test]
async fn non_matching_events_not_delivered() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe(Subscription::new(
        "presence",
        vec![EventPattern::new("presence:*")],
    ));

    bus.publish(acquired("G1"));

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn publish_all_keeps_order() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe(Subscription::new("all", vec![EventPattern::any()]));

    bus.publish_all([acquired("G1"), acquired("G2")]);

    assert_eq!(rx.try_recv().unwrap(), acquired("G1"));
    assert_eq!(rx.try_recv().unwrap(), acquired("G2"));
}

#[test]
fn unsubscribe_removes_subscriber() {
    let bus = EventBus::new();
    let _rx = bus.subscribe(Subscription::new("sub", vec![EventPattern::any()]));
    assert_eq!(bus.subscriber_count(), 1);

    bus.unsubscribe(&SubscriberId("sub".to_string()));
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn dropped_receivers_are_pruned() {
    let bus = EventBus::new();
    let rx = bus.subscribe(Subscription::new("gone", vec![EventPattern::any()]));
    let _kept = bus.subscribe(Subscription::new("kept", vec![EventPattern::any()]));
    drop(rx);

    bus.publish(acquired("G1"));

    assert_eq!(bus.subscriber_count(), 1);
}

#[test]
fn clone_shares_subscribers() {
    let bus = EventBus::new();
    let other = bus.clone();
    let _rx = bus.subscribe(Subscription::new("sub", vec![EventPattern::any()]));

    assert_eq!(other.subscriber_count(), 1);
}
