//! Runs the front end over every fixture under conformance/.
//!
//! Positive fixtures must parse. Negative fixtures name the error they
//! expect on their first line (`// expect: <Kind>`); the ones whose kind is
//! a front-end error must fail here with exactly that kind.

use std::path::{Path, PathBuf};

use causal_core::{parse_source, CompileError, Expr};

fn conformance_dir(sub: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../conformance")
        .join(sub)
}

fn fixtures(sub: &str) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(conformance_dir(sub))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "causal"))
        .collect();
    paths.sort();
    paths
}

fn expected_kind(src: &str) -> String {
    src.lines()
        .next()
        .and_then(|l| l.strip_prefix("// expect:"))
        .map(|k| k.trim().to_owned())
        .unwrap_or_else(|| panic!("negative fixture without '// expect:' line"))
}

#[test]
fn all_positive_fixtures_parse() {
    let paths = fixtures("positive");
    assert!(!paths.is_empty(), "no positive fixtures found");
    let mut failures = Vec::new();
    for path in &paths {
        let src = std::fs::read_to_string(path).unwrap();
        if let Err(e) = parse_source(&src) {
            failures.push(format!("{}: {}", path.display(), e));
        }
    }
    assert!(failures.is_empty(), "fixtures failed to parse:\n{}", failures.join("\n"));
}

#[test]
fn front_end_negative_fixtures_fail_with_their_kind() {
    let mut checked = 0;
    for path in fixtures("negative") {
        let src = std::fs::read_to_string(&path).unwrap();
        let kind = expected_kind(&src);
        match parse_source(&src) {
            Err(e) => {
                assert_eq!(e.kind(), kind, "{}", path.display());
                checked += 1;
            }
            Ok(_) => assert!(
                kind != "LexError" && kind != "ParseError",
                "{} should fail with {}",
                path.display(),
                kind
            ),
        }
    }
    assert!(checked >= 3, "expected at least three front-end failures");
}

#[test]
fn facility_domain_structure() {
    let src = std::fs::read_to_string(conformance_dir("positive").join("facility_domain.causal"))
        .unwrap();
    let program = parse_source(&src).unwrap();
    let intentions: Vec<_> = program
        .rules
        .iter()
        .map(|r| r.intention().name.as_str())
        .collect();
    assert_eq!(intentions, vec!["move-to", "stack", "stack", "stack-all"]);

    let recursive = &program.rules[2];
    assert_eq!(recursive.intention().args.last(), Some(&Expr::Cont(1)));
    assert_eq!(
        recursive.actions()[1].args[3],
        Expr::Decimal("0.5".into())
    );
    assert!(program.rules[3].guard.is_some());
}

#[test]
fn errors_report_the_line() {
    let err = parse_source("RULES {\n  a(x) := b(x);\n  c(y) d(y)\n}").unwrap_err();
    match err {
        CompileError::Parse { line, .. } => assert_eq!(line, 3),
        other => panic!("expected parse error, got {:?}", other),
    }
}
