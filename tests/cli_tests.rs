//! Integration tests for the accprof inspection CLI
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::io::Write;

#[test]
fn test_events_lists_every_event() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.arg("events");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("acc_ev_create"))
        .stdout(predicate::str::contains("ompt_callback_target_data_op"))
        .stdout(predicate::str::contains("acc_ev_wait_start"))
        .stdout(predicate::str::contains("(not supported)"))
        .stdout(predicate::str::contains("(raised from tool finalize)"));
}

#[test]
fn test_events_json_parses() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.arg("events").arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 27);

    let launch = rows
        .iter()
        .find(|row| row["event"] == "acc_ev_enqueue_launch_start")
        .unwrap();
    assert_eq!(launch["supported"], true);
    assert_eq!(
        launch["callbacks"],
        serde_json::json!(["ompt_callback_target", "ompt_callback_target_submit"])
    );
}

#[test]
fn test_callbacks_json_lists_sharing_events() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.arg("callbacks").arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let data_op = parsed
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["callback"] == "ompt_callback_target_data_op")
        .unwrap();
    assert_eq!(data_op["value"], 9);
    assert_eq!(data_op["events"].as_array().unwrap().len(), 8);
}

#[test]
fn test_config_shows_proflib_list() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.env("ACC_PROFLIB", "liba.so;;libb.so").arg("config");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("proflib_var:       ACC_PROFLIB"))
        .stdout(predicate::str::contains("proflibs:          2"))
        .stdout(predicate::str::contains("  liba.so"))
        .stdout(predicate::str::contains("  libb.so"));
}

#[test]
fn test_proflib_without_libraries_succeeds() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.env_remove("ACC_PROFLIB").arg("proflib");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no profiling libraries listed in ACC_PROFLIB"));
}

#[test]
fn test_proflib_rejects_non_library() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "not a shared object").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.arg("proflib").arg(&path);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains(path.as_str()))
        .stderr(predicate::str::contains("1 of 1 profiling libraries failed"));
}

#[test]
fn test_proflib_json_reports_missing_file() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.arg("proflib")
        .arg("/nonexistent/libprof.so")
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(!output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["path"], "/nonexistent/libprof.so");
    assert_eq!(parsed[0]["ok"], false);
    assert!(parsed[0]["error"]
        .as_str()
        .unwrap()
        .starts_with("cannot open /nonexistent/libprof.so"));
}

#[test]
fn test_missing_subcommand_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("accprof");
    cmd.assert().failure();
}
