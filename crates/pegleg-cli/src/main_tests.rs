use super::*;
use pegleg_core::Builder;
use std::io::Write as _;

fn sample_tree_json() -> String {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();
    serde_json::to_string(&tree).unwrap()
}

#[test]
fn reads_input_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(sample_tree_json().as_bytes()).unwrap();
    let text = read_input(&file.path().to_path_buf()).unwrap();
    assert!(text.contains("\"R\""));
}

#[test]
fn reads_input_returns_error_for_missing_file() {
    let missing = PathBuf::from("/nonexistent/path/to/grammar.json");
    let err = read_input(&missing).unwrap_err();
    assert!(matches!(err, CliError::ReadFile { .. }));
}

#[test]
fn writes_output_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.go");
    write_output(Some(path.as_path()), "package main\n").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "package main\n");
}

#[test]
fn run_compiles_valid_grammar_successfully() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(sample_tree_json().as_bytes()).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("out.go");

    let args = Args { input: file.path().to_path_buf(), output: Some(out_path.clone()) };
    let ok = run(args).unwrap();
    assert!(ok);

    let generated = fs::read_to_string(&out_path).unwrap();
    assert!(generated.contains("p.rules[ruleR]"));
}

/// A grammar that references an undeclared rule is still fully emitted (a
/// `nil` table entry), but the unresolved reference is reported as a
/// diagnostic and the process exit code reflects it.
#[test]
fn run_reports_nonzero_exit_on_undefined_rule() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_name("Missing").unwrap();
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();
    let json = serde_json::to_string(&tree).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("out.go");

    let args = Args { input: file.path().to_path_buf(), output: Some(out_path) };
    let ok = run(args).unwrap();
    assert!(!ok);
}
