// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use camino::Utf8Path;
use remora_harness::{stimulus, Golden, HarnessError};
use snafu::{ResultExt, Whatever};

fn data(file: &str) -> String {
    format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), file)
}

#[test]
#[snafu::report]
fn parses_two_integers() -> Result<(), Whatever> {
    let golden = Golden::parse("3 6").whatever_context("parse")?;
    assert_eq!(golden, Golden { ans1: 3, ans2: 6 });
    Ok(())
}

#[test]
#[snafu::report]
fn parses_across_lines_and_ignores_trailing_tokens() -> Result<(), Whatever> {
    let golden =
        Golden::parse("982\n74173812\nextra\n").whatever_context("parse")?;
    assert_eq!(golden.ans1, 982);
    assert_eq!(golden.ans2, 74173812);
    Ok(())
}

#[test]
fn rejects_fewer_than_two_integers() {
    assert!(matches!(
        Golden::parse("3"),
        Err(HarnessError::GoldenCount { found: 1 })
    ));
    assert!(matches!(
        Golden::parse("  \n"),
        Err(HarnessError::GoldenCount { found: 0 })
    ));
}

#[test]
fn rejects_unparseable_tokens() {
    match Golden::parse("3 sixty") {
        Err(HarnessError::GoldenParse { token, .. }) => {
            assert_eq!(token, "sixty");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
    assert!(matches!(
        Golden::parse("-3 6"),
        Err(HarnessError::GoldenParse { .. })
    ));
}

#[test]
#[snafu::report]
fn loads_golden_results_from_disk() -> Result<(), Whatever> {
    let golden = Golden::load(Utf8Path::new(&data("golden_results.txt")))
        .whatever_context("load")?;
    assert_eq!(golden, Golden { ans1: 3, ans2: 6 });
    Ok(())
}

#[test]
fn missing_golden_source_is_fatal() {
    let result = Golden::load(Utf8Path::new("does/not/exist.txt"));
    match result {
        Err(HarnessError::GoldenSource { path, .. }) => {
            assert_eq!(path, "does/not/exist.txt");
        }
        other => panic!("expected a source error, got {other:?}"),
    }
}

#[test]
#[snafu::report]
fn loads_input_lines_from_disk() -> Result<(), Whatever> {
    let lines = stimulus::load_lines(Utf8Path::new(&data("input.txt")))
        .whatever_context("load")?;
    assert_eq!(lines, ["abc"]);
    Ok(())
}

#[test]
fn missing_input_source_is_fatal() {
    assert!(matches!(
        stimulus::load_lines(Utf8Path::new("does/not/exist.txt")),
        Err(HarnessError::InputSource { .. })
    ));
}
