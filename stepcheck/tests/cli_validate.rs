//! CLI tests for `stepcheck validate`.
//!
//! Spawns the binary inside a temp project and checks exit codes for the
//! no-specs, parse-failure, pass and fail paths.

use std::fs;
use std::process::Command;

use stepcheck::exit_codes;
use stepcheck::io::config::StepcheckConfig;
use stepcheck::test_support::TestProject;

const ONE_SPEC: &str = r#"{
    "specs": [{
        "file": "specs/cart.spec",
        "heading": { "text": "Cart", "line_no": 1 },
        "items": [{
            "kind": "scenario",
            "heading": { "text": "Add", "line_no": 3 },
            "items": [
                { "kind": "step", "value": "add item {}", "line_text": "add item \"pen\"", "line_no": 4, "args": ["pen"] },
                { "kind": "step", "value": "missing step", "line_text": "missing step", "line_no": 5 }
            ]
        }]
    }]
}"#;

/// Runner that rejects any step mentioning "missing".
#[cfg(unix)]
const SH_RUNNER: &str = r#"while read -r line; do
  case "$line" in
    *KillProcessRequest*) exit 0 ;;
    *missing*) echo '{"message_type":"StepValidateResponse","step_validate_response":{"is_valid":false,"error_type":"STEP_IMPLEMENTATION_NOT_FOUND"}}' ;;
    *) echo '{"message_type":"StepValidateResponse","step_validate_response":{"is_valid":true}}' ;;
  esac
done"#;

fn stepcheck(project: &TestProject, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_stepcheck"))
        .current_dir(project.root())
        .arg("validate")
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run stepcheck")
}

#[cfg(unix)]
fn sh_runner_config() -> StepcheckConfig {
    let mut cfg = StepcheckConfig::default();
    cfg.runner.command = vec!["sh".to_string(), "-c".to_string(), SH_RUNNER.to_string()];
    cfg.runner_request_timeout_ms = 5_000;
    cfg
}

#[test]
fn no_specs_exits_ok_without_runner() {
    let project = TestProject::new().expect("project");
    let mut cfg = StepcheckConfig::default();
    cfg.runner.command = vec!["definitely-not-a-runner-binary".to_string()];
    project.write_config(&cfg).expect("config");
    project.write_suite_json(r#"{ "specs": [] }"#).expect("suite");

    let output = stepcheck(&project, &[]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No specifications found."));
}

#[test]
fn critical_parse_errors_exit_invalid() {
    let project = TestProject::new().expect("project");
    project
        .write_suite_json(
            r#"{ "parse": { "ok": false, "critical_errors": ["concepts/a.cpt:1 bad heading"] } }"#,
        )
        .expect("suite");

    let output = stepcheck(&project, &[]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn missing_suite_document_exits_invalid() {
    let project = TestProject::new().expect("project");

    let output = stepcheck(&project, &[]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("load suite document"));
}

#[cfg(unix)]
#[test]
fn unimplemented_step_exits_validation_failed_and_writes_report() {
    let project = TestProject::new().expect("project");
    project.write_config(&sh_runner_config()).expect("config");
    project.write_suite_json(ONE_SPEC).expect("suite");

    let output = stepcheck(&project, &["--report", "out/report.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::VALIDATION_FAILED));
    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.root().join("out/report.json")).expect("read report"),
    )
    .expect("report json");
    assert_eq!(report["status"], "failed");
    assert_eq!(report["step_errors"][0]["line_text"], "missing step");
    assert_eq!(report["spec_errors"][0]["file"], "specs/cart.spec");
}

#[cfg(unix)]
#[test]
fn selecting_an_implemented_spec_passes() {
    let project = TestProject::new().expect("project");
    project.write_config(&sh_runner_config()).expect("config");
    let suite = ONE_SPEC.replace("missing step", "remove item");
    project.write_suite_json(&suite).expect("suite");

    let output = stepcheck(&project, &["specs/cart.spec"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No error found."));
}
