mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use support::TestProject;

fn cli(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("plansync").expect("binary");
    cmd.env_remove("PLANSYNC_DIR")
        .env_remove("RUST_LOG")
        .arg("--dir")
        .arg(project.path());
    cmd
}

#[test]
fn plansync_help_works() {
    Command::cargo_bin("plansync")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Schedule update orchestrator"));
}

#[test]
fn subcommand_help_works() {
    for cmd in ["update", "interactive", "rollup", "check"] {
        Command::cargo_bin("plansync")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn check_reports_counts() {
    let project = TestProject::new();
    cli(&project)
        .arg("check")
        .assert()
        .success()
        .stdout(contains("documents are valid"))
        .stdout(contains("- tasks: 3"))
        .stdout(contains("- linked issues: 2"));
}

#[test]
fn check_rejects_malformed_document() {
    let project = TestProject::new();
    project.write_file("schedule.json", "{ not json");
    cli(&project)
        .arg("check")
        .assert()
        .code(2)
        .stderr(contains("Invalid document"))
        .stderr(contains("hint: fix"));
}

#[test]
fn check_rejects_invalid_config() {
    let project = TestProject::new();
    project.write_file(".plansync.toml", "[schedule]\nmax_weeks = 0\n");
    cli(&project)
        .arg("check")
        .assert()
        .code(2)
        .stderr(contains("Invalid configuration"));
}

#[test]
fn missing_project_dir_is_a_user_error() {
    let project = TestProject::new();
    Command::cargo_bin("plansync")
        .expect("binary")
        .env_remove("PLANSYNC_DIR")
        .arg("--dir")
        .arg(project.file("nope"))
        .arg("check")
        .assert()
        .code(2)
        .stderr(contains("project directory not found"));
}

#[test]
fn rollup_prints_weeks_without_writing() {
    let project = TestProject::new();
    let before = project.snapshot_bytes();
    cli(&project)
        .arg("rollup")
        .assert()
        .success()
        .stdout(contains("Week 1 (2026-01-06 〜 2026-01-10): 2 task(s), 15%"))
        .stdout(contains("Week 2 (2026-01-13 〜 2026-01-17): 1 task(s), 35%"))
        .stdout(contains("stored weekly schedule is out of date"));
    assert_eq!(project.snapshot_bytes(), before);
}

#[test]
fn json_envelope_for_check() {
    let project = TestProject::new();
    let output = cli(&project)
        .arg("--json")
        .arg("check")
        .output()
        .expect("run");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["schema_version"], "plansync.v1");
    assert_eq!(payload["command"], "check");
    assert_eq!(payload["status"], "success");
    assert_eq!(payload["data"]["tasks"], 3);
}

#[test]
fn quiet_suppresses_human_output() {
    let project = TestProject::new();
    cli(&project)
        .arg("--quiet")
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
