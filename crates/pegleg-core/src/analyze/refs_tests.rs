use super::*;
use crate::builder::Builder;
use crate::diagnostics::{DiagnosticKind, Severity};

#[test]
fn undefined_rule_is_diagnosed() {
    // A = B 'x' ; B is never defined.
    let mut b = Builder::new();
    b.add_rule("A").unwrap();
    b.add_name("B").unwrap();
    b.add_string("x");
    b.add_sequence().unwrap();
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();

    let (diags, _) = run(&tree);
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::UndefinedRule && d.rule.as_deref() == Some("B")));
}

#[test]
fn unreachable_rule_is_diagnosed_unused() {
    // A = 'x' ; C = 'y' (C unreachable from start rule A).
    let mut b = Builder::new();
    b.add_rule("A").unwrap();
    b.add_string("x");
    b.add_expression().unwrap();
    b.add_rule("C").unwrap();
    b.add_string("y");
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();

    let (diags, counts) = run(&tree);
    assert_eq!(counts[tree.rule_id("C").unwrap().index()], 0);
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnusedRule && d.rule.as_deref() == Some("C")));
    assert!(diags.iter().all(|d| d.severity == Severity::Warning));
}

#[test]
fn start_rule_is_never_flagged_unused() {
    let mut b = Builder::new();
    b.add_rule("A").unwrap();
    b.add_dot();
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();

    let (diags, _) = run(&tree);
    assert!(diags.is_empty());
}

#[test]
fn cyclic_reference_terminates_and_counts_once_per_occurrence() {
    // A = B ; B = A 'x' / A — A is referenced twice from B, B once from A.
    let mut b = Builder::new();
    b.add_rule("A").unwrap();
    b.add_name("B").unwrap();
    b.add_expression().unwrap();

    b.add_rule("B").unwrap();
    b.add_name("A").unwrap();
    b.add_string("x");
    b.add_sequence().unwrap();
    b.add_name("A").unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();

    let (diags, counts) = run(&tree);
    assert!(diags.is_empty());
    assert_eq!(counts[tree.rule_id("B").unwrap().index()], 1);
    assert_eq!(counts[tree.rule_id("A").unwrap().index()], 2);
}
