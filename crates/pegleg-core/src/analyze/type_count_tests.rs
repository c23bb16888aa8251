use super::*;
use crate::builder::Builder;
use crate::ast::NodeKind;

#[test]
fn counts_every_node_kind_once_per_occurrence() {
    // R = 'a' [0-9]* / .
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_class("0-9");
    b.add_star().unwrap();
    b.add_sequence().unwrap();
    b.add_dot();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();

    let counts = count(&tree);
    assert_eq!(counts.get(NodeKind::Rule), 1);
    assert_eq!(counts.get(NodeKind::String), 1);
    assert_eq!(counts.get(NodeKind::Class), 1);
    assert_eq!(counts.get(NodeKind::Star), 1);
    assert_eq!(counts.get(NodeKind::Sequence), 1);
    assert_eq!(counts.get(NodeKind::Dot), 1);
    assert_eq!(counts.get(NodeKind::Alternate), 1);
    assert!(!counts.any(NodeKind::Plus));
}

#[test]
fn captured_name_counts_as_variable_not_name() {
    // R = x:Other
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_variable("x");
    b.add_name("Other").unwrap();
    b.add_expression().unwrap();
    let tree = b.finish().unwrap();

    let counts = count(&tree);
    assert_eq!(counts.get(NodeKind::Variable), 1);
    assert_eq!(counts.get(NodeKind::Name), 0);
}

#[test]
fn rules_with_no_occurrences_report_zero() {
    let tree = Builder::new().finish();
    assert!(tree.is_err() || count(&tree.unwrap()).get(NodeKind::Rule) == 0);
}
