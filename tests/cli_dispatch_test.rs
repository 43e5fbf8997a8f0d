// tests/cli_dispatch_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

/// The binary with its home (and so its config file) inside `home`.
fn main_command(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("HOME", home).env_remove("OWNER_ID");
    cmd
}

#[test]
fn test_help_flag() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Examples:"))
        .stdout(predicate::str::contains("--analyse"));
}

#[test]
fn test_missing_entry_shows_usage() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_pick_requires_analyse() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .args(["-s", "https://example.com/a.bin", "--pick", "video:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--analyse"));
}

#[test]
fn test_dir_leech_missing_path_reports_reason() {
    let home = tempdir().unwrap();
    let missing = home.path().join("does-not-exist");
    main_command(home.path())
        .args(["-m", "dir-leech", "-s"])
        .arg(&missing)
        .arg("--work-dir")
        .arg(home.path().join("work"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("TASK STOPPED"))
        .stderr(predicate::str::contains("Directory not found."));
}

#[test]
fn test_dir_leech_delivers_local_file_to_outbox() {
    let home = tempdir().unwrap();
    let file = home.path().join("notes.txt");
    std::fs::write(&file, "leech me").unwrap();
    let outbox = home.path().join("outbox");

    main_command(home.path())
        .args(["-m", "dir-leech", "-s"])
        .arg(&file)
        .arg("--work-dir")
        .arg(home.path().join("work"))
        .arg("--outbox")
        .arg(&outbox)
        .assert()
        .success()
        .stdout(predicate::str::contains("TASK COMPLETED"));

    assert_eq!(std::fs::read_to_string(outbox.join("notes.txt")).unwrap(), "leech me");
    // the user's own file is copied, never moved
    assert!(file.exists());
    assert!(home.path().join(".tg-leech").join("config.json").exists());
}
