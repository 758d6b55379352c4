use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn wagewatch(store: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("wagewatch"));
    cmd.arg("--store").arg(store);
    cmd
}

fn read_store(store: &std::path::Path) -> serde_json::Value {
    let bytes = std::fs::read(store).expect("settings file should exist");
    serde_json::from_slice(&bytes).expect("settings file should be valid JSON")
}

#[test]
fn test_earnings_recovered_across_processes() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");

    // 36000/hour is 10 units per second, so even a short run banks a
    // clearly positive amount.
    wagewatch(&store)
        .args(["config", "--wage", "36000"])
        .assert()
        .success();
    wagewatch(&store).arg("start").assert().success();

    thread::sleep(Duration::from_millis(1_200));

    wagewatch(&store).arg("stop").assert().success();

    let settings = read_store(&store);
    let banked = settings["Earned"]["value"].as_f64().unwrap();
    assert!(banked > 1.0, "banked = {banked}");
    assert!(settings.get("StartDate").is_none());

    // A third process still sees the banked amount.
    wagewatch(&store)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state: idle"));
}

#[test]
fn test_start_timestamp_persisted_while_running() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");

    wagewatch(&store).arg("start").assert().success();

    let settings = read_store(&store);
    assert_eq!(settings["StartDate"]["type"], "timestamp");
    assert!(settings["StartDate"]["value"].as_f64().unwrap() > 0.0);

    wagewatch(&store).arg("stop").assert().success();
    assert!(read_store(&store).get("StartDate").is_none());
}

#[test]
fn test_watch_follows_a_live_run() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");

    wagewatch(&store)
        .args(["config", "--wage", "36000"])
        .assert()
        .success();
    wagewatch(&store).arg("start").assert().success();

    wagewatch(&store)
        .args(["watch", "--seconds", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("USD"));

    wagewatch(&store).arg("stop").assert().success();
}

#[test]
fn test_corrupt_store_defaults_cleanly() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");
    std::fs::write(&store, b"{ definitely not settings").unwrap();

    wagewatch(&store)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state: idle"))
        .stdout(predicate::str::contains("wage: 7.25 USD per hour"));
}
