//! Integration tests for `astest --debug`

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn debug_cmd(file: &NamedTempFile) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("astest");
    cmd.env("NO_COLOR", "1")
        .env("ASTEST_TERM_WIDTH", "40")
        .env("ASTEST_NO_HISTORY", "1")
        .arg("--debug")
        .arg(file.path());
    cmd
}

// ── Sessions ──────────────────────────────────────────────────────────────────

#[test]
fn test_failing_assertion_opens_console() {
    let file = create_test_file("let x = 41;\nassert x == 42;\n");
    debug_cmd(&file)
        .write_stdin("x + 1\n:continue\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting debug session:"))
        .stdout(predicate::str::contains("42\n"))
        .stdout(predicate::str::contains(" 1 failed, 0 passed in "));
}

#[test]
fn test_passing_assertions_never_open_console() {
    let file = create_test_file("assert true;\nassert 1 < 2;\n");
    debug_cmd(&file)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting debug session:").not())
        .stdout(predicate::str::contains(" 2 passed in "));
}

#[test]
fn test_eof_resumes_the_tests() {
    let file = create_test_file("assert false;\nassert false;\nassert true;\n");
    let output = debug_cmd(&file).write_stdin("").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Starting debug session:").count(), 2);
    assert!(stdout.contains(" 2 failed, 1 passed in "));
}

#[test]
fn test_vars_command_lists_function_locals() {
    let file = create_test_file(
        "fn check(n) {\n  let half = n / 2;\n  assert half == 1;\n}\ncheck(6);\n",
    );
    debug_cmd(&file)
        .write_stdin(":vars\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("half = 3"))
        .stdout(predicate::str::contains("n = 6"));
}

#[test]
fn test_errors_in_console_do_not_abort_run() {
    let file = create_test_file("let items = [1, 2];\nassert len(items) == 3;\n");
    debug_cmd(&file)
        .write_stdin("items[7]\nlen(items)\n:c\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Index 7 out of bounds for length 2"))
        .stdout(predicate::str::contains("2\n"));
}

#[test]
fn test_help_command() {
    let file = create_test_file("assert false;\n");
    debug_cmd(&file)
        .write_stdin(":help\n:c\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Debug console commands:"))
        .stdout(predicate::str::contains(":vars"));
}
