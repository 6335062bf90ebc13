// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn g1() -> ResourceId {
    ResourceId::new("G1")
}

fn held(token: &str) -> Lease {
    Lease::new(
        g1(),
        LeaseState::Held {
            holder: HolderToken::new(token),
        },
    )
}

#[test]
fn new_lease_is_free() {
    let lease = Lease::free(g1());
    assert!(lease.is_free());
    assert!(lease.holder().is_none());
    assert_eq!(
        lease.snapshot(),
        LeaseSnapshot {
            resource: g1(),
            busy: false,
            holder: None,
        }
    );
}

#[test]
fn acquire_free_lease_succeeds() {
    let lease = Lease::free(g1());
    let token = HolderToken::new("t-1");

    let (next, events) = lease.transition(LeaseInput::Acquire {
        holder: token.clone(),
    });

    assert!(next.is_held_by(&token));
    assert!(next.snapshot().busy);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Event::LeaseAcquired { resource, holder } if resource == &g1() && holder == &token
    ));
}

#[test]
fn acquire_held_lease_is_denied() {
    let lease = held("t-1");

    let (next, events) = lease.transition(LeaseInput::Acquire {
        holder: HolderToken::new("t-2"),
    });

    assert_eq!(next, lease);
    assert_eq!(events, vec![Event::LeaseDenied { resource: g1() }]);
}

#[test]
fn release_frees_held_lease() {
    let (next, events) = held("t-1").transition(LeaseInput::Release);

    assert!(next.is_free());
    assert!(matches!(
        &events[0],
        Event::LeaseReleased { holder, .. } if holder.as_str() == "t-1"
    ));
}

#[test]
fn release_of_free_lease_is_silent() {
    let lease = Lease::free(g1());
    let (next, events) = lease.transition(LeaseInput::Release);

    assert!(next.is_free());
    assert!(events.is_empty());
}

#[test]
fn release_held_with_matching_token() {
    let (next, events) = held("t-1").transition(LeaseInput::ReleaseHeld {
        holder: HolderToken::new("t-1"),
    });

    assert!(next.is_free());
    assert_eq!(events.len(), 1);
}

#[test]
fn release_held_with_stale_token_is_noop() {
    let lease = held("t-2");
    let (next, events) = lease.transition(LeaseInput::ReleaseHeld {
        holder: HolderToken::new("t-1"),
    });

    assert_eq!(next, lease);
    assert!(events.is_empty());
}

#[test]
fn state_serializes_with_status_tag() {
    let json = serde_json::to_value(LeaseState::Held {
        holder: HolderToken::new("abc"),
    })
    .unwrap();
    assert_eq!(json["status"], "held");
    assert_eq!(json["holder"], "abc");

    let free: LeaseState = serde_json::from_str(r#"{"status":"free"}"#).unwrap();
    assert!(free.is_free());
}

#[derive(Clone, Debug)]
enum Op {
    Acquire,
    Release,
    ReleaseHeldCurrent,
    ReleaseHeldStale,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Acquire),
        Just(Op::Release),
        Just(Op::ReleaseHeldCurrent),
        Just(Op::ReleaseHeldStale),
    ]
}

proptest! {
    // busy and holder never disagree, and a denied acquire never changes the holder
    #[test]
    fn holder_invariant_holds(ops in proptest::collection::vec(op(), 1..50)) {
        let mut lease = Lease::free(g1());
        let mut issued = 0u32;

        for op in ops {
            let input = match op {
                Op::Acquire => {
                    issued += 1;
                    LeaseInput::Acquire { holder: HolderToken::new(format!("t-{issued}")) }
                }
                Op::Release => LeaseInput::Release,
                Op::ReleaseHeldCurrent => match lease.holder() {
                    Some(h) => LeaseInput::ReleaseHeld { holder: h.clone() },
                    None => LeaseInput::Release,
                },
                Op::ReleaseHeldStale => LeaseInput::ReleaseHeld {
                    holder: HolderToken::new("t-0"),
                },
            };

            let before = lease.holder().cloned();
            let (next, events) = lease.transition(input.clone());

            let snapshot = next.snapshot();
            prop_assert_eq!(snapshot.busy, snapshot.holder.is_some());

            if let LeaseInput::Acquire { .. } = input {
                if before.is_some() {
                    prop_assert_eq!(next.holder().cloned(), before.clone());
                    let denied = matches!(events[..], [Event::LeaseDenied { .. }]);
                    prop_assert!(denied, "expected a single denial, got {:?}", events);
                }
            }
            if let LeaseInput::ReleaseHeld { holder } = &input {
                if holder.as_str() == "t-0" {
                    prop_assert_eq!(next.holder().cloned(), before.clone());
                }
            }

            lease = next;
        }
    }
}
