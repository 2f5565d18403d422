//! Smoke tests for the `plantwatch` binary against a scratch data directory.

#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

const PROFILE: &str = r#"{
    "id": 1,
    "name": "Tomato",
    "soil_moisture": {"min": 40, "max": 60},
    "temperature": {"min": 20, "max": 28},
    "humidity": {"min": 60, "max": 80},
    "warning_trigger": 3,
    "suggested_action": "Water deeply"
}"#;

fn plantwatch(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plantwatch"))
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--no-sync")
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn json(data_dir: &Path, args: &[&str]) -> Value {
    let output = plantwatch(data_dir, args);
    assert!(
        output.status.success(),
        "plantwatch {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_profile_activate_ingest() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let profile_path = dir.path().join("tomato.json");
    fs::write(&profile_path, PROFILE).unwrap();

    let added = json(&data, &["profile-add", profile_path.to_str().unwrap()]);
    assert_eq!(added["name"], "Tomato");

    let active = json(&data, &["activate", "1"]);
    assert_eq!(active["id"], 1);

    // Each run is a fresh process, so the streak is read back from disk.
    for level in 1..=3u64 {
        let result = json(&data, &["ingest", "30", "24", "70"]);
        assert_eq!(result["success"], true);
        assert_eq!(result["warningLevel"], level);
        assert_eq!(result["notificationTriggered"], level == 3);
    }

    let notes = json(&data, &["notifications", "--unread"]);
    assert_eq!(notes.as_array().unwrap().len(), 1);
    assert_eq!(notes[0]["suggested_action"], "Water deeply");

    let stats = json(&data, &["stats", "--hours", "1"]);
    assert_eq!(stats["readingCount"], 3);

    let clean = json(&data, &["ingest", "50", "24", "70"]);
    assert_eq!(clean["warningLevel"], 0);
}

#[test]
fn test_ingest_without_active_plant() {
    let dir = tempdir().unwrap();
    let result = json(dir.path(), &["ingest", "30", "24", "70"]);
    assert_eq!(result["success"], false);
    assert_eq!(result["failure"], "no_active_profile");
}

#[test]
fn test_stats_rejects_non_positive_hours() {
    let dir = tempdir().unwrap();
    for hours in ["0", "-1"] {
        let output = plantwatch(dir.path(), &["stats", "--hours", hours]);
        assert!(!output.status.success(), "--hours {hours} was accepted");
    }
}
