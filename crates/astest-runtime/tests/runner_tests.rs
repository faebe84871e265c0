//! End-to-end runs of script files through the runner

mod common;

use astest_runtime::{RunError, Runner, RuntimeError};
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn mixed_outcomes_are_numbered_in_execution_order() {
    let file = script(
        "let x = 2;
assert x == 2;
assert x == 3;
fn check(n) { assert n > 0; return n; }
check(1);
check(-1);
",
    );
    let (runner, buf) = capturing_runner(false);
    let summary = runner.run(file.path()).unwrap();

    assert_eq!(summary.test_count, 4);
    assert_eq!(summary.pass_count, 2);
    insta::assert_snapshot!(buf.outcome_lines(), @r"
    Test 1..................PASSED
    Test 2..................FAILED
    Failing test: x == 3
    Test 3..................PASSED
    Test 4..................FAILED
    Failing test: n > 0
    ");

    // wider than the 30 columns, so the summary gets no `=` fill
    let text = buf.text();
    let last = text.lines().last().unwrap();
    assert!(last.starts_with(" 2 failed, 2 passed in "), "summary line: {:?}", last);
    assert!(last.ends_with(" seconds "), "summary line: {:?}", last);
}

#[test]
fn summary_is_filled_when_it_fits() {
    let file = script("assert true;
assert false;
");
    let buf = SharedBuf::default();
    let runner = Runner::new(plain_options(false, 60)).with_output(Box::new(buf.clone()));
    runner.run(file.path()).unwrap();

    let text = buf.text();
    let last = text.lines().last().unwrap();
    assert_eq!(last.chars().count(), 60);
    assert!(last.starts_with("===="), "summary line: {:?}", last);
    assert!(last.contains(" 1 failed, 1 passed in "), "summary line: {:?}", last);
    assert!(last.ends_with(" seconds ===="), "summary line: {:?}", last);
}

#[test]
fn all_passing_summary() {
    let file = script("assert true;\nassert [1, 2] == [1, 2];\n");
    let (runner, buf) = capturing_runner(false);
    runner.run(file.path()).unwrap();

    let text = buf.text();
    let last = text.lines().last().unwrap();
    assert!(last.contains(" 2 passed in "));
    assert!(!last.contains("failed"));
    assert_eq!(last.chars().count(), 30);
}

#[test]
fn multiline_assertion_snippet() {
    let file = script("assert (1 ==\n  2);\n");
    let (runner, buf) = capturing_runner(false);
    runner.run(file.path()).unwrap();

    insta::assert_snapshot!(buf.outcome_lines(), @r"
    Test 1..................FAILED
    Failing test: (1 ==
      2)
    ");
}

#[test]
fn test_expression_is_evaluated_once() {
    let file = script(
        "var calls = 0;
fn bump() { calls += 1; return true; }
assert bump();
assert calls == 1;
",
    );
    let (runner, _) = capturing_runner(false);
    let summary = runner.run(file.path()).unwrap();
    assert_eq!(summary.pass_count, 2);
}

#[test]
fn non_boolean_results_fail() {
    let file = script("assert 1;\nassert \"yes\";\nassert null;\nassert true;\n");
    let (runner, _) = capturing_runner(false);
    let summary = runner.run(file.path()).unwrap();
    assert_eq!(summary.test_count, 4);
    assert_eq!(summary.pass_count, 1);
}

#[test]
fn assertions_in_loops_record_each_iteration() {
    let file = script("for i in range(0, 5) {\n  assert i < 3;\n}\n");
    let (runner, buf) = capturing_runner(false);
    let summary = runner.run(file.path()).unwrap();
    assert_eq!(summary.test_count, 5);
    assert_eq!(summary.fail_count(), 2);
    assert_eq!(buf.text().matches("Failing test: i < 3").count(), 2);
}

#[test]
fn runtime_error_after_some_assertions() {
    let file = script("assert true;\nlet xs = [1];\nxs[5];\n");
    let (runner, buf) = capturing_runner(false);
    let err = runner.run(file.path()).unwrap_err();

    assert!(matches!(
        err,
        RunError::Runtime {
            error: RuntimeError::OutOfBounds { index: 5, len: 1, .. },
            ..
        }
    ));
    assert_eq!(err.exit_code(), 1);
    let rendered = err.to_string();
    assert!(rendered.contains(":3:1: error[AS4001]"), "{}", rendered);
    assert!(rendered.contains("    | xs[5];"), "{}", rendered);

    // outcomes before the error were already printed, the summary was not
    assert_eq!(buf.text().lines().count(), 1);
}

#[test]
fn compile_errors_are_reported_with_location() {
    let file = script("assert true;\nbreak;\n");
    let (runner, buf) = capturing_runner(false);
    let err = runner.run(file.path()).unwrap_err();

    let diagnostics = err.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 2);
    assert_eq!(diagnostics[0].snippet, "break;");
    assert_eq!(buf.text(), "");
}

#[test]
fn no_assertions_exit_code() {
    let file = script("let unused = 1;\n");
    let (runner, buf) = capturing_runner(false);
    let err = runner.run(file.path()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(
        err.to_string(),
        "No tests ran. Make sure the code does some `assert`s."
    );
    assert_eq!(buf.text(), "");
}

#[test]
fn instrumented_tree_has_no_asserts() {
    let file = script("fn f() { assert true; }\nassert false;\n");
    let (runner, _) = capturing_runner(true);
    let unit = runner.instrument(file.path()).unwrap();
    let json = astest_runtime::VersionedProgram::new(unit.program)
        .to_json()
        .unwrap();
    assert!(!json.contains("\"Assert\""));
    assert!(json.contains("$maybe_debug"));
}
