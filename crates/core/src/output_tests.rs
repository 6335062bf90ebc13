// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    on_upper = { "ON:3", OutputCommand::on(OutputId(3)) },
    off_upper = { "OFF:12", OutputCommand::off(OutputId(12)) },
    lower_case = { "off:1", OutputCommand::off(OutputId(1)) },
    padded_output = { "ON: 7", OutputCommand::on(OutputId(7)) },
)]
fn parses_command(input: &str, expected: OutputCommand) {
    assert_eq!(input.parse::<OutputCommand>().unwrap(), expected);
}

#[parameterized(
    no_separator = { "ON3" },
    bad_level = { "BLINK:3" },
    bad_output = { "ON:A0" },
    empty = { "" },
)]
fn rejects_malformed_command(input: &str) {
    assert!(input.parse::<OutputCommand>().is_err());
}

#[test]
fn display_uses_wire_form() {
    assert_eq!(OutputCommand::off(OutputId(4)).to_string(), "OFF:4");
    assert_eq!(OutputCommand::on(OutputId(8)).to_string(), "ON:8");
}

#[test]
fn parse_error_names_the_problem() {
    let err = "BLINK:3".parse::<OutputCommand>().unwrap_err();
    assert_eq!(err, CommandParseError::UnknownLevel("BLINK".to_string()));
}

#[test]
fn level_serializes_uppercase() {
    let json = serde_json::to_string(&OutputCommand::on(OutputId(2))).unwrap();
    assert_eq!(json, r#"{"output":2,"level":"ON"}"#);
}
