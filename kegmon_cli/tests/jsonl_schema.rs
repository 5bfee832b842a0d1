use assert_cmd::prelude::*;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[detection]
stability_filter = "raw"
pour_filter = "raw"
stabilization_ms = 2000
pour_ms = 2000

[[channels]]
glass_volume_l = 1.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

/// Every stdout line of a JSON replay is an event object, then one summary.
#[rstest]
fn replay_jsonl_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let trace = dir.path().join("trace.csv");
    fs::write(
        &trace,
        "timestamp_ms,channel,weight_kg\n\
         0,U1,5.0\n1000,U1,5.0\n2000,U1,5.0\n3000,U1,5.0\n\
         4000,U1,4.75\n5000,U1,4.5\n6000,U1,4.5\n",
    )
    .unwrap();

    let out = Command::cargo_bin("kegmon")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg(&trace)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);
    let (summary, events) = lines.split_last().expect("at least one line");

    for e in events {
        assert_eq!(e["type"], "event");
        assert!(e["event"].is_string());
        assert!(e["channel"].is_string());
        assert!(e["ts_ms"].is_u64());
        assert!(e["details"].is_object());
    }
    assert_eq!(events[0]["event"], "startup");

    let pour = events
        .iter()
        .find(|e| e["event"] == "pour_completed")
        .expect("pour_completed event");
    assert_eq!(pour["channel"], "U1");
    assert_eq!(pour["ts_ms"], 6000);
    assert_eq!(pour["details"]["duration_ms"], 2000);
    let vol = pour["details"]["pour_volume_l"].as_f64().unwrap();
    assert!((vol - 0.5).abs() < 1e-4, "{vol}");

    assert_eq!(summary["type"], "summary");
    let channels = summary["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["channel"], "U1");
    assert_eq!(channels[0]["total_pours"], 1);
    assert_eq!(channels[0]["readings"], 7);
}

#[rstest]
fn self_check_json() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("kegmon")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["ok"], true);
    assert_eq!(lines[0]["stability_filter"], "raw");
    assert_eq!(lines[0]["channels"].as_array().unwrap().len(), 4);
}

/// Errors are a single JSON object on stderr when --json is set.
#[rstest]
fn error_json_on_stderr() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[sampling]\nrate_hz = 0\n").unwrap();

    let out = Command::cargo_bin("kegmon")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr.lines().find(|l| l.contains("\"reason\"")).expect("error line");
    let v: Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["type"], "error");
    assert!(v["message"].as_str().unwrap().contains("sampling.rate_hz"));
}
