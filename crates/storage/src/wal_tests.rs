// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lg_core::{HolderToken, LeaseState, Resource, ResourceId};

fn held(token: &str) -> Operation {
    Operation::LeaseSet {
        resource: ResourceId::new("G1"),
        state: LeaseState::Held {
            holder: HolderToken::new(token),
        },
    }
}

#[test]
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lg.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&Operation::ResourceUpsert {
            resource: Resource::new("G1", "Planets").with_outputs([1, 2, 3]),
        })
        .unwrap();
        wal.append(&held("t-1")).unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0], Operation::ResourceUpsert { .. }));
    assert_eq!(ops[1], held("t-1"));
}

#[test]
fn wal_sequence_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lg.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        wal.append(&held("t-1")).unwrap();
        assert_eq!(wal.sequence(), 1);
    }

    let wal = Wal::open(&path).unwrap();
    assert_eq!(wal.sequence(), 1);
}

#[test]
fn wal_replay_nonexistent() {
    let ops = Wal::replay(Path::new("/nonexistent/path/wal")).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn corrupt_line_reports_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lg.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&held("t-1")).unwrap();
    }
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("{not json\n");
    std::fs::write(&path, contents).unwrap();

    let err = Wal::replay(&path).unwrap_err();
    assert!(matches!(err, WalError::Json { line: 2, .. }));
}

#[test]
fn compact_replaces_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lg.wal");

    let mut wal = Wal::open(&path).unwrap();
    for n in 0..5 {
        wal.append(&held(&format!("t-{n}"))).unwrap();
    }
    wal.compact(&[held("t-4")]).unwrap();
    assert_eq!(wal.sequence(), 1);

    wal.append(&held("t-5")).unwrap();
    assert_eq!(wal.sequence(), 2);

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops, vec![held("t-4"), held("t-5")]);
}
