use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("ponts")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("--system-prompt"));
}

#[test]
fn test_exec_help_shows_options() {
    cargo_bin_cmd!("ponts")
        .args(["exec", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--prompt"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--show-reasoning"));
}

#[test]
fn test_exec_requires_prompt() {
    cargo_bin_cmd!("ponts")
        .arg("exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--prompt"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("ponts")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ponts"));
}
