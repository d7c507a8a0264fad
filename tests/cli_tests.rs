// tests/cli_tests.rs
//
// The `wqb-validate` binary against catalogs in a temporary data directory.

mod common;

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

fn data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    common::write_catalogs(dir.path());
    dir
}

fn wqb(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wqb-validate").unwrap();
    cmd.current_dir(data.path())
        .env("WQB_DATA_DIR", data.path())
        .env_remove("WQB_REGION")
        .env_remove("WQB_DELAY")
        .env_remove("WQB_UNIVERSE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn valid_expression_exits_zero() {
    let data = data_dir();
    wqb(&data)
        .args(["check", "ts_mean(close, 20)"])
        .assert()
        .success()
        .stdout(contains("expression"));
}

#[test]
fn invalid_expression_reports_miette_diagnostic() {
    let data = data_dir();
    wqb(&data)
        .args(["check", "ts_mean(cloze, 20)"])
        .assert()
        .code(1)
        .stderr(contains("wqb::fields::unknown_field").and(contains("did you mean `close`?")));
}

#[test]
fn json_output_is_machine_readable() {
    let data = data_dir();
    let output = wqb(&data)
        .args(["check", "--json", "quantile(close, driver=\"bogus\")"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["ok"], false);
    assert_eq!(value["errors"][0]["kind"], "NamedArgumentError");
    assert_eq!(value["errors"][0]["column"], 24);
}

#[test]
fn expression_can_come_from_stdin_or_file() {
    let data = data_dir();
    wqb(&data)
        .arg("check")
        .write_stdin("x = close\nrank(x)\n")
        .assert()
        .success();

    let file = data.path().join("alpha.expr");
    fs::write(&file, "rank(volum)").unwrap();
    wqb(&data)
        .args(["check", "--file"])
        .arg(&file)
        .assert()
        .code(1)
        .stderr(contains("alpha.expr"));
}

#[test]
fn context_flags_select_the_field_set() {
    let data = data_dir();
    wqb(&data)
        .args(["--region", "CHN", "--delay", "0", "--universe", "TOP2000U"])
        .args(["check", "rank(volume)"])
        .assert()
        .code(1)
        .stderr(contains("CHN_0_TOP2000U"));
}

#[test]
fn batch_summarises_every_block() {
    let data = data_dir();
    let file = data.path().join("alphas.txt");
    fs::write(&file, "rank(close)\n\nrank(cloze)\n\nx = open\nts_mean(x, 5)\n").unwrap();
    wqb(&data)
        .arg("batch")
        .arg(&file)
        .assert()
        .code(1)
        .stdout(contains("3 expressions checked").and(contains("1 invalid")));
}

#[test]
fn batch_json_lists_named_results() {
    let data = data_dir();
    let file = data.path().join("alphas.txt");
    fs::write(&file, "rank(close)\n\nrank(open)\n").unwrap();
    let output = wqb(&data).arg("batch").arg(&file).arg("--json").output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(2));
    assert!(value[1]["name"].as_str().unwrap().ends_with("alphas.txt:3"));
    assert_eq!(value[1]["ok"], true);
}

#[test]
fn keys_and_fields_are_listed() {
    let data = data_dir();
    wqb(&data)
        .arg("keys")
        .assert()
        .success()
        .stdout(contains("USA_1_TOP3000").and(contains("CHN_0_TOP2000U")));

    wqb(&data)
        .arg("fields")
        .assert()
        .success()
        .stdout(contains("close").and(contains("returns\tMATRIX")));
}

#[test]
fn missing_catalog_is_an_operational_failure() {
    let empty = tempfile::tempdir().unwrap();
    wqb(&empty)
        .args(["check", "rank(close)"])
        .assert()
        .code(2)
        .stderr(contains("wqb::catalog"));
}
