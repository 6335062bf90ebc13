// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

//! Argument handling that needs no daemon

use assert_cmd::Command;
use predicates::prelude::*;

fn lg() -> Command {
    Command::cargo_bin("lg").unwrap()
}

#[test]
fn help_lists_lease_commands() {
    lg().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("acquire"))
        .stdout(predicate::str::contains("force-release"))
        .stdout(predicate::str::contains("hold"));
}

#[test]
fn completions_name_the_binary() {
    lg().args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_lg"));
}

#[test]
fn force_release_needs_a_target() {
    lg().arg("force-release")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn malformed_output_command_is_rejected_before_connecting() {
    lg().args(["output", "BLINK:3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown level"));
}

#[test]
fn help_lists_broadcast_commands() {
    lg().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("bridge"))
        .stdout(predicate::str::contains("outputs"));
}

#[test]
fn bridge_rejects_malformed_pin_before_connecting() {
    lg().args(["bridge", "/dev/null", "--pin", "GPIO17"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected <output>=<pin>"));
}
