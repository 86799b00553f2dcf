//! CLI integration tests for all implemented subcommands.
//!
//! Uses `assert_cmd` to spawn the `causalc` binary and verify
//! exit codes, stdout content, stderr content and written files.
//!
//! Tests set `current_dir` to the workspace root so that relative
//! paths to conformance fixtures resolve, unless they need a scratch
//! working directory for config discovery.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn fixture(kind: &str, name: &str) -> PathBuf {
    workspace_root()
        .join("conformance")
        .join(kind)
        .join(format!("{}.causal", name))
}

/// Helper: create a Command for the `causalc` binary, rooted at workspace.
fn causalc() -> Command {
    let mut cmd = cargo_bin_cmd!("causalc");
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

const SHAPE_CONFLICT: &str = "RULES { a(x) := b(x); a(x, y) := b(x), c(y) }";

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    causalc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Causal-mapping rule compiler"));
}

#[test]
fn version_exits_0() {
    causalc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("causalc"));
}

#[test]
fn compile_help_lists_out_flag() {
    causalc()
        .args(["compile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--out"));
}

// ──────────────────────────────────────────────
// 2. Compile subcommand
// ──────────────────────────────────────────────

#[test]
fn compile_writes_both_modules() {
    let dir = TempDir::new().unwrap();
    causalc()
        .args(["compile", "conformance/positive/facility_domain.causal", "--out"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote recognizer"))
        .stdout(predicate::str::contains("wrote decomposer"));

    let recognizer = fs::read_to_string(dir.path().join("facility_domain.py")).unwrap();
    assert!(recognizer.contains("def causes(v):"), "{}", recognizer);
    assert!(recognizer.contains("M = 2"), "{}", recognizer);
    let decomposer = fs::read_to_string(dir.path().join("imitation.py")).unwrap();
    assert!(
        decomposer.contains("pyhop.declare_methods('stack-all', stack_all)"),
        "{}",
        decomposer
    );
}

#[test]
fn compile_accepts_literal_source_text() {
    let dir = TempDir::new().unwrap();
    causalc()
        .args(["compile", "--text", "RULES { A(x) := B(x) }", "--out"])
        .arg(dir.path())
        .assert()
        .success();
    let decomposer = fs::read_to_string(dir.path().join("imitation.py")).unwrap();
    assert!(decomposer.contains("def A(state, x):"), "{}", decomposer);
}

#[test]
fn compile_parse_error_writes_nothing() {
    let dir = TempDir::new().unwrap();
    causalc()
        .arg("compile")
        .arg(fixture("negative", "missing_arrow"))
        .arg("--out")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("recognizer failed: ParseError"))
        .stderr(predicate::str::contains("decomposer failed: ParseError"));
    assert!(!dir.path().join("facility_domain.py").exists());
    assert!(!dir.path().join("imitation.py").exists());
}

#[test]
fn compile_shape_conflict_keeps_recognizer() {
    let dir = TempDir::new().unwrap();
    causalc()
        .args(["compile", "--text", SHAPE_CONFLICT, "--out"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("wrote recognizer"))
        .stderr(predicate::str::contains("decomposer failed: ShapeConflictError"));
    assert!(dir.path().join("facility_domain.py").exists());
    assert!(!dir.path().join("imitation.py").exists());
}

#[test]
fn compile_json_error_carries_kind() {
    let dir = TempDir::new().unwrap();
    causalc()
        .args(["--output", "json", "compile", "--text", SHAPE_CONFLICT, "--out"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\": \"ShapeConflictError\""))
        .stderr(predicate::str::contains("\"backend\": \"decomposer\""));
}

#[test]
fn compile_missing_file_exits_1() {
    causalc()
        .args(["compile", "conformance/positive/no_such_file.causal"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading"));
}

#[test]
fn quiet_compile_prints_nothing() {
    let dir = TempDir::new().unwrap();
    causalc()
        .args(["--quiet", "compile", "--text", "RULES { A(x) := B(x) }", "--out"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 3. Check and tokens subcommands
// ──────────────────────────────────────────────

#[test]
fn check_reports_both_backends() {
    causalc()
        .args(["check", "conformance/positive/facility_domain.causal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recognizer: ok (4 rules, M = 2)"))
        .stdout(predicate::str::contains("decomposer: ok (3 methods, 4 reductions)"));
}

#[test]
fn check_json_lists_methods() {
    let assert = causalc()
        .args([
            "--output",
            "json",
            "check",
            "conformance/positive/nested_cont_disjunction.causal",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["recognizer"]["m"], 2);
    assert_eq!(json["decomposer"]["methods"][0]["intention"], "pack");
    assert_eq!(json["decomposer"]["methods"][0]["reductions"], 3);
    assert_eq!(json["decomposer"]["methods"][1]["reductions"], 2);
}

#[test]
fn check_negative_fixtures_fail_with_expected_kind() {
    let dir = workspace_root().join("conformance/negative");
    let mut entries: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    assert!(!entries.is_empty());
    for path in entries {
        let src = fs::read_to_string(&path).unwrap();
        let kind = src
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("// expect:"))
            .map(str::trim)
            .unwrap()
            .to_owned();
        causalc()
            .arg("check")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains(format!("decomposer failed: {}", kind)));
    }
}

#[test]
fn tokens_dumps_stream_with_lines() {
    causalc()
        .args(["tokens", "--text", "RULES {\n a(x) := b(x) }"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'RULES'"))
        .stdout(predicate::str::contains("identifier 'a'"))
        .stdout(predicate::str::contains("   2  ':='"));
}

#[test]
fn tokens_lex_error_exits_1() {
    causalc()
        .args(["tokens", "--text", "RULES { a(x) := b(x) @ }"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LexError"));
}

// ──────────────────────────────────────────────
// 4. Configuration and logging
// ──────────────────────────────────────────────

#[test]
fn config_file_sets_output_names() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(
        &config,
        format!(
            "[output]\ndir = \"{}\"\nrecognizer = \"rec.py\"\ndecomposer = \"dec.py\"\n",
            dir.path().join("gen").display()
        ),
    )
    .unwrap();
    causalc()
        .arg("--config")
        .arg(&config)
        .args(["compile", "--text", "RULES { A(x) := B(x) }"])
        .assert()
        .success();
    assert!(dir.path().join("gen/rec.py").exists());
    assert!(dir.path().join("gen/dec.py").exists());
}

#[test]
fn default_config_is_found_in_working_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("causalc.toml"), "[output]\ndir = \"out\"\n").unwrap();
    let mut cmd = cargo_bin_cmd!("causalc");
    cmd.current_dir(dir.path())
        .args(["compile", "--text", "RULES { A(x) := B(x) }"])
        .assert()
        .success();
    assert!(dir.path().join("out/facility_domain.py").exists());
    assert!(dir.path().join("out/imitation.py").exists());
}

#[test]
fn out_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("causalc.toml"), "[output]\ndir = \"out\"\n").unwrap();
    let mut cmd = cargo_bin_cmd!("causalc");
    cmd.current_dir(dir.path())
        .args(["compile", "--text", "RULES { A(x) := B(x) }", "--out", "flag"])
        .assert()
        .success();
    assert!(dir.path().join("flag/imitation.py").exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn invalid_config_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[output\n").unwrap();
    causalc()
        .arg("--config")
        .arg(&config)
        .args(["check", "--text", "RULES { A(x) := B(x) }"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not parse"));
}

#[test]
fn template_override_from_config() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("dec.tmpl");
    fs::write(&template, "# custom\n{{METHODS}}\n").unwrap();
    let config = dir.path().join("causalc.toml");
    fs::write(
        &config,
        format!("[templates]\ndecomposer = \"{}\"\n", template.display()),
    )
    .unwrap();
    causalc()
        .arg("--config")
        .arg(&config)
        .args(["compile", "--text", "RULES { A(x) := B(x) }", "--out"])
        .arg(dir.path())
        .assert()
        .success();
    let decomposer = fs::read_to_string(dir.path().join("imitation.py")).unwrap();
    assert!(decomposer.starts_with("# custom\ndef A(state, x):"), "{}", decomposer);
}

#[test]
fn log_file_records_stages_even_on_failure() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("logs/compiler.log");
    causalc()
        .arg("--log-file")
        .arg(&log)
        .args(["compile", "--text", SHAPE_CONFLICT, "--out"])
        .arg(dir.path())
        .assert()
        .failure();
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("recognizer compiled"), "{}", text);
    assert!(text.contains("backend failed"), "{}", text);
}
