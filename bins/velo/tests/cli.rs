use assert_cmd::Command;
use predicates::prelude::*;

fn velo() -> Command {
    let mut cmd = Command::cargo_bin("velo").unwrap();
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    velo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stations"))
        .stdout(predicate::str::contains("distance"))
        .stdout(predicate::str::contains("track"));
}

#[test]
fn test_distance() {
    velo()
        .args(["distance", "51.2194,4.4025", "51.2294,4.4125"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1.3 km NE (32."));
}

#[test]
fn test_distance_json() {
    let output = velo()
        .args(["distance", "51.2194,4.4025", "51.2194,4.4025", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["distance_km"], 0.0);
    assert_eq!(value["bearing_degrees"], 0.0);
    assert_eq!(value["distance_label"], "0 m");
    assert_eq!(value["compass_point"], "N");
}

#[test]
fn test_distance_accepts_southern_hemisphere() {
    velo()
        .args(["distance", "-33.9249,18.4241", "-33.9180,18.4233"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0.77 km N ("));
}

#[test]
fn test_distance_rejects_out_of_range() {
    velo()
        .args(["distance", "95,4.4", "51.2,4.4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("95"));
}

#[test]
fn test_track_fixed_point() {
    velo()
        .args(["track", "--to", "51.2294,4.4125"])
        .write_stdin("51.2194,4.4025\n\n51.2194,4.4025,32\nerror:timeout\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("↗ 1.3 km NE (32°) · no compass"))
        .stdout(predicate::str::contains("↑ 1.3 km NE (32°)\n"))
        .stdout(predicate::str::contains("bearing unavailable: timed out"));
}

#[test]
fn test_track_json() {
    let output = velo()
        .args(["track", "--to", "51.2294,4.4125", "--json"])
        .write_stdin("51.2194,4.4025\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let line = String::from_utf8(output.stdout).unwrap();
    let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(value["state"], "ready");
    assert_eq!(value["value"]["distance_label"], "1.3 km");
    assert_eq!(value["value"]["heading_applied"], false);
}

#[test]
fn test_track_skips_non_finite_heading() {
    velo()
        .args(["track", "--to", "51.2294,4.4125"])
        .write_stdin("51.2194,4.4025,nan\n51.2194,4.4025\n")
        .assert()
        .success()
        .stdout("↗ 1.3 km NE (32°) · no compass\n");
}
