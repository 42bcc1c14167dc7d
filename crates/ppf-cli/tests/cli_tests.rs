use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Helper function to create a temporary directory for CLI tests
fn create_cli_test_environment() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Command with plain output, an isolated XDG data home and a fresh database
fn ppf_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ppf").expect("Failed to find ppf binary");
    let db_path = temp_dir.path().join("cli_test.db");
    cmd.env("XDG_DATA_HOME", temp_dir.path())
        .arg("--no-color")
        .arg("--database-file")
        .arg(db_path);
    cmd
}

fn start_intervention(temp_dir: &TempDir, task_ref: &str) {
    ppf_cmd(temp_dir)
        .args(["intervention", "start", task_ref])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started intervention with ID: 1"));
}

fn write_png(path: &Path) {
    image::RgbImage::from_fn(80, 60, |x, y| image::Rgb([(x * 3) as u8, (y * 4) as u8, 90]))
        .save(path)
        .expect("Failed to write test image");
}

#[test]
fn test_cli_list_empty() {
    let temp_dir = create_cli_test_environment();
    ppf_cmd(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No interventions found."));
}

#[test]
fn test_cli_start_intervention() {
    let temp_dir = create_cli_test_environment();
    ppf_cmd(&temp_dir)
        .args(["--technician", "tech-7", "intervention", "start", "TASK-100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# 1. TASK-100"))
        .stdout(predicate::str::contains("- Technician: tech-7"))
        .stdout(predicate::str::contains("### 1. Inspection"))
        .stdout(predicate::str::contains("### 5. Finalization"));

    ppf_cmd(&temp_dir)
        .args(["intervention", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- 1. TASK-100 (not_started, 0%, tech-7)"));
}

#[test]
fn test_cli_current_step_and_gating() {
    let temp_dir = create_cli_test_environment();
    start_intervention(&temp_dir, "TASK-1");

    ppf_cmd(&temp_dir)
        .args(["intervention", "current", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current step: Inspection"));

    ppf_cmd(&temp_dir)
        .args(["step", "access", "1", "installation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("locked"));

    ppf_cmd(&temp_dir)
        .args(["step", "begin", "1", "installation"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("inspection must be completed first"));
}

#[test]
fn test_cli_draft_then_advance() {
    let temp_dir = create_cli_test_environment();
    start_intervention(&temp_dir, "TASK-2");

    ppf_cmd(&temp_dir)
        .args([
            "step",
            "draft",
            "1",
            "inspection",
            "--data",
            r#"{"checklist": {"hood": true}}"#,
            "--notes",
            "Chip on the hood",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Draft saved for step 'inspection' (revision 1)"));

    ppf_cmd(&temp_dir)
        .args([
            "step",
            "advance",
            "1",
            "inspection",
            "--data",
            r#"{"checklist": {"hood": true}}"#,
            "--photo",
            "https://cdn.test/1.jpg",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires at least 4 photo(s), 1 provided"));

    let mut cmd = ppf_cmd(&temp_dir);
    cmd.args(["step", "advance", "1", "inspection", "--data", r#"{"checklist": {"hood": true}}"#]);
    for i in 0..4 {
        cmd.arg("--photo").arg(format!("https://cdn.test/{i}.jpg"));
    }
    cmd.args(["--score", "92"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed step 'Inspection'"))
        .stdout(predicate::str::contains("- Progress: 20%"))
        .stdout(predicate::str::contains("- Next step: Preparation"));
}

#[test]
fn test_cli_rejects_malformed_json_data() {
    let temp_dir = create_cli_test_environment();
    start_intervention(&temp_dir, "TASK-3");

    ppf_cmd(&temp_dir)
        .args(["step", "draft", "1", "inspection", "--data", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn test_cli_capture_photo() {
    let temp_dir = create_cli_test_environment();
    start_intervention(&temp_dir, "TASK-4");
    let image_path = temp_dir.path().join("front.png");
    write_png(&image_path);

    ppf_cmd(&temp_dir)
        .args(["--location", "48.85,2.35", "photo", "capture", "1", "inspection"])
        .arg(&image_path)
        .args(["--angle", "front"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Attached photo 1 to step 'inspection' (1 photo(s))"))
        .stdout(predicate::str::contains("file://"))
        .stdout(predicate::str::contains("80x60, front, 48.85000,2.35000"));

    ppf_cmd(&temp_dir)
        .args(["photo", "list", "1", "inspection"])
        .assert()
        .success()
        .stdout(predicate::str::contains("80x60"));
}

#[test]
fn test_cli_capture_photo_offline() {
    let temp_dir = create_cli_test_environment();
    start_intervention(&temp_dir, "TASK-5");
    let image_path = temp_dir.path().join("rear.png");
    write_png(&image_path);

    ppf_cmd(&temp_dir)
        .args(["--offline", "photo", "capture", "1", "inspection"])
        .arg(&image_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Upload photo indisponible hors ligne"));

    ppf_cmd(&temp_dir)
        .args(["photo", "list", "1", "inspection"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No photos attached."));
}

#[test]
fn test_cli_exec_request() {
    let temp_dir = create_cli_test_environment();

    let output = ppf_cmd(&temp_dir)
        .arg("exec")
        .write_stdin(r#"{"caller": {"user_id": "tech-1"}, "action": "start_intervention", "payload": {"task_ref": "TASK-EXEC"}}"#)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response: Value = serde_json::from_slice(&output).expect("response is JSON");
    assert_eq!(response["type"], "intervention");
    assert_eq!(response["data"]["task_ref"], "TASK-EXEC");
    assert_eq!(response["data"]["technician_id"], "tech-1");

    let output = ppf_cmd(&temp_dir)
        .args([
            "exec",
            r#"{"caller": {"user_id": "tech-1"}, "action": "finalize", "payload": {"intervention_id": 1}}"#,
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response: Value = serde_json::from_slice(&output).expect("response is JSON");
    assert_eq!(response["type"], "error");
    assert_eq!(response["data"]["code"], "prerequisite_not_met");

    ppf_cmd(&temp_dir)
        .args(["exec", "[]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("invalid_request"));
}

#[test]
fn test_cli_invalid_config_file() {
    let temp_dir = create_cli_test_environment();
    let config_path = temp_dir.path().join("config.json");
    std::fs::write(&config_path, r#"{"acceptance_threshold": 150}"#).unwrap();

    ppf_cmd(&temp_dir)
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("acceptance_threshold"));
}
