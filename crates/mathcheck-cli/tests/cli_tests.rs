//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ALGEBRA: &str = "../../question-sets/algebra.toml";
const COORDINATES: &str = "../../question-sets/coordinates.toml";

fn mathcheck() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("mathcheck").unwrap()
}

#[test]
fn validate_algebra_set() {
    mathcheck()
        .arg("validate")
        .arg("--question-set")
        .arg(ALGEBRA)
        .assert()
        .success()
        .stdout(predicate::str::contains("6 questions, 8 parts"))
        .stdout(predicate::str::contains("All question sets valid"));
}

#[test]
fn validate_directory() {
    mathcheck()
        .arg("validate")
        .arg("--question-set")
        .arg("../../question-sets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Algebra Basics"))
        .stdout(predicate::str::contains("Coordinate Geometry"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(
        &path,
        r#"
[question_set]
id = "broken"
name = "Broken"

[[questions]]
id = "q"

[[questions.parts]]
id = "a"
slots = ["(x+1"]
"#,
    )
    .unwrap();

    mathcheck()
        .arg("validate")
        .arg("--question-set")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[q/a] slot 1 alternative '(x+1' does not parse"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    mathcheck()
        .arg("validate")
        .arg("--question-set")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn check_pooled_answers_in_any_order() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "quadratic", "--part", "a"])
        .args(["--input", "3", "--input", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"))
        .stdout(predicate::str::contains("symbolic"));
}

#[test]
fn check_wrong_answer_fails_on_wrong() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "quadratic", "--part", "a"])
        .args(["--input", "2", "--input", "2"])
        .arg("--fail-on-wrong")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn check_wrong_answer_without_flag_succeeds() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "surd", "--part", "a"])
        .args(["--input", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn check_negative_inputs_and_sentinel() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "inequality", "--part", "a"])
        .args(["--input", "-2", "--input", "2", "--input", ""])
        .assert()
        .success()
        .stdout(predicate::str::contains("not required"))
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn check_json_output() {
    let output = mathcheck()
        .args(["check", "--question-set", COORDINATES])
        .args(["--question", "circle", "--part", "a"])
        .args(["--input", "(-3, -4)", "--input", r"\left(3, 4\right)"])
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["passed"], true);
    assert_eq!(value["slots"][0]["outcome"], "matched");
    assert_eq!(value["slots"][0]["strategy"], "coordinate");
}

#[test]
fn check_input_count_mismatch() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "quadratic", "--part", "a"])
        .args(["--input", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expected 2 inputs, got 1"))
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn check_unknown_part() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "quadratic", "--part", "z"])
        .args(["--input", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quadratic/z not found"));
}

#[test]
fn check_self_assessed_part() {
    mathcheck()
        .args(["check", "--question-set", ALGEBRA])
        .args(["--question", "inequality", "--part", "proof"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("self-assessed"));
}

#[test]
fn equiv_symbolic() {
    mathcheck()
        .args(["equiv", "x+1", "1+x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("equivalent (symbolic)"));
}

#[test]
fn equiv_tolerance_boundary() {
    mathcheck()
        .args(["equiv", "2.0001", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("equivalent (numeric)"));

    mathcheck()
        .args(["equiv", "2.03", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not equivalent"));

    mathcheck()
        .args(["equiv", "2.03", "2", "--tolerance", "0.05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("equivalent (numeric)"));
}

#[test]
fn equiv_rejects_negative_tolerance() {
    mathcheck()
        .args(["equiv", "1", "1", "--tolerance=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tolerance"));
}

#[test]
fn parse_shows_canonical_form() {
    mathcheck()
        .args(["parse", r"\frac{1}{2} + \frac{1}{2}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("normalized:"))
        .stdout(predicate::str::contains("canonical:  1"));
}

#[test]
fn parse_error_fails() {
    mathcheck()
        .args(["parse", "(x+1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}

#[test]
fn grade_writes_report() {
    let dir = TempDir::new().unwrap();

    mathcheck()
        .args(["grade", "--question-set", ALGEBRA])
        .args(["--submissions", "../../submissions/algebra.json"])
        .arg("--output")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Pass rate"))
        .stdout(predicate::str::contains("75.0%"))
        .stderr(predicate::str::contains("Results saved to"));

    let reports: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn grade_rejects_zero_parallelism() {
    let dir = TempDir::new().unwrap();
    mathcheck()
        .args(["grade", "--question-set", ALGEBRA])
        .args(["--submissions", "../../submissions/algebra.json"])
        .args(["--parallelism", "0"])
        .arg("--output")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("parallelism must be at least 1"));
}

#[test]
fn config_file_changes_tolerance() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("strict.toml");
    std::fs::write(&config, "[verifier]\ntolerance = 0.00001\n").unwrap();

    mathcheck()
        .arg("--config")
        .arg(&config)
        .args(["equiv", "2.0001", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not equivalent"));
}

#[test]
fn missing_config_file_fails() {
    mathcheck()
        .args(["--config", "no-such-config.toml", "equiv", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    mathcheck()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created mathcheck.toml"))
        .stdout(predicate::str::contains("Created question-sets/example.toml"));

    assert!(dir.path().join("mathcheck.toml").exists());
    assert!(dir.path().join("question-sets/example.toml").exists());

    mathcheck()
        .current_dir(dir.path())
        .args(["validate", "--question-set", "question-sets/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All question sets valid"));

    mathcheck()
        .current_dir(dir.path())
        .args(["check", "--question-set", "question-sets/example.toml"])
        .args(["--question", "roots", "--part", "a"])
        .args(["--input", "-3", "--input", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    mathcheck()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    mathcheck()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    mathcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Answer verification for math study apps"));
}

#[test]
fn version_output() {
    mathcheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mathcheck"));
}
