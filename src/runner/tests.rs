//! Tests for the process runners.

use super::*;
use rstest::rstest;
use std::fmt::Write as _;

fn sh(script: &str) -> Vec<OsString> {
    vec![OsString::from("-c"), OsString::from(script)]
}

/// Helper to run a shell script via `StreamingCommandRunner` and assert expected output.
fn assert_streaming_runner_output(
    script: &str,
    expected_code: Option<i32>,
    expected_stdout: &str,
    expected_stderr: &str,
) {
    let runner = StreamingCommandRunner;
    let output = runner
        .run("sh", &sh(script))
        .expect("command should execute successfully");

    assert_eq!(output.code, expected_code);
    assert_eq!(output.stdout, expected_stdout);
    assert_eq!(output.stderr, expected_stderr);
}

#[rstest]
fn streaming_runner_captures_output() {
    assert_streaming_runner_output("printf out && printf err 1>&2", Some(0), "out", "err");
}

#[rstest]
fn streaming_runner_captures_output_on_failure() {
    assert_streaming_runner_output(
        "printf out && printf err 1>&2; exit 42",
        Some(42),
        "out",
        "err",
    );
}

#[rstest]
fn streaming_runner_propagates_non_zero_exit_code() {
    assert_streaming_runner_output("exit 3", Some(3), "", "");
}

#[rstest]
fn streaming_runner_captures_large_interleaved_output() {
    let runner = StreamingCommandRunner;
    let output = runner
        .run(
            "sh",
            &sh("for i in $(seq 1 50); do printf \"out-%03d\\n\" $i; printf \"err-%03d\\n\" $i 1>&2; done"),
        )
        .expect("command should execute successfully");

    let mut expected_out = String::new();
    let mut expected_err = String::new();
    for i in 1..=50 {
        writeln!(&mut expected_out, "out-{i:03}").expect("write expected_out");
        writeln!(&mut expected_err, "err-{i:03}").expect("write expected_err");
    }

    assert_eq!(output.code, Some(0));
    assert_eq!(output.stdout, expected_out);
    assert_eq!(output.stderr, expected_err);
}

#[rstest]
fn streaming_runner_feeds_stdin() {
    let runner = StreamingCommandRunner;
    let output = runner
        .run_with_input("cat", &[], "NO_START=0\n")
        .expect("cat should run");

    assert!(output.is_success());
    assert_eq!(output.stdout, "NO_START=0\n");
}

#[rstest]
#[case::streaming(&StreamingCommandRunner as &dyn CommandRunner)]
#[case::process(&ProcessCommandRunner as &dyn CommandRunner)]
fn failed_spawn_returns_spawn_error(#[case] runner: &dyn CommandRunner) {
    let result = runner.run("definitely-not-a-real-binary-xyz", &[]);

    match result {
        Err(RunnerError::Spawn { ref program, .. }) => {
            assert_eq!(program, "definitely-not-a-real-binary-xyz");
        }
        other => panic!("expected RunnerError::Spawn, got {other:?}"),
    }
}

#[rstest]
fn process_runner_captures_without_forwarding() {
    let output = ProcessCommandRunner
        .run("sh", &sh("printf captured; exit 5"))
        .expect("sh should run");

    assert_eq!(output.code, Some(5));
    assert_eq!(output.stdout, "captured");
    assert!(!output.is_success());
}

#[rstest]
fn process_runner_feeds_stdin() {
    let output = ProcessCommandRunner
        .run_with_input("sh", &sh("cat; printf done 1>&2"), "JETTY_PORT=8983\n")
        .expect("sh should run");

    assert!(output.is_success());
    assert_eq!(output.stdout, "JETTY_PORT=8983\n");
    assert_eq!(output.stderr, "done");
}

#[rstest]
#[case::streaming(&StreamingCommandRunner as &dyn CommandRunner)]
#[case::process(&ProcessCommandRunner as &dyn CommandRunner)]
fn killed_child_reports_signal(#[case] runner: &dyn CommandRunner) {
    let output = runner
        .run("sh", &sh("kill -9 $$"))
        .expect("sh should run");

    assert_eq!(output.code, None);
    assert_eq!(output.signal, Some(9));
    assert_eq!(output.exit_code(), Some(137));
    assert_eq!(output.status_text(), "137 (signal 9)");
}

#[rstest]
#[case::streaming(&StreamingCommandRunner as &dyn CommandRunner)]
#[case::process(&ProcessCommandRunner as &dyn CommandRunner)]
fn inherited_run_captures_nothing(#[case] runner: &dyn CommandRunner) {
    let output = runner
        .run_inherited("sh", &sh("printf visible; exit 4"))
        .expect("sh should run");

    assert_eq!(output.code, Some(4));
    assert_eq!(output.exit_code(), Some(4));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

#[rstest]
fn inherited_run_reports_signal() {
    let output = ProcessCommandRunner
        .run_inherited("sh", &sh("kill -15 $$"))
        .expect("sh should run");

    assert_eq!(output.signal, Some(15));
    assert_eq!(output.exit_code(), Some(143));
}

#[rstest]
fn inherited_run_reports_spawn_failure() {
    let result = StreamingCommandRunner.run_inherited("definitely-not-a-real-binary-xyz", &[]);
    assert!(matches!(result, Err(RunnerError::Spawn { .. })), "got {result:?}");
}

#[rstest]
#[case(Some(0), None, "0")]
#[case(Some(3), None, "3")]
#[case(None, Some(9), "137 (signal 9)")]
#[case(None, None, "unknown")]
fn status_text_describes_exit_status(
    #[case] code: Option<i32>,
    #[case] signal: Option<i32>,
    #[case] expected: &str,
) {
    let output = CommandOutput {
        code,
        signal,
        stdout: String::new(),
        stderr: String::new(),
    };
    assert_eq!(output.status_text(), expected);
}

#[rstest]
#[case(Some(2), None, Some(2))]
#[case(None, Some(9), Some(137))]
#[case(None, None, None)]
fn exit_code_follows_shell_convention(
    #[case] code: Option<i32>,
    #[case] signal: Option<i32>,
    #[case] expected: Option<i32>,
) {
    let output = CommandOutput {
        code,
        signal,
        stdout: String::new(),
        stderr: String::new(),
    };
    assert_eq!(output.exit_code(), expected);
}
