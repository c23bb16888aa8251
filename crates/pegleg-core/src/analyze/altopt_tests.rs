use super::*;
use crate::ast::{ListKind, Node};
use crate::builder::Builder;

fn rule_expr(tree: &Tree, name: &str) -> Node {
    tree.rule_by_name(name).unwrap().expr.clone()
}

#[test]
fn disjoint_alternate_becomes_unordered_switch() {
    // R = 'a' X / 'b' Y / 'c' Z  (scenario S5)
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    for (lit, rhs) in [("a", "X"), ("b", "Y"), ("c", "Z")] {
        b.add_string(lit);
        b.add_name(rhs).unwrap();
        b.add_sequence().unwrap();
    }
    // fold the three sequences into one flat alternate.
    b.add_alternate().unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    tree.switch = true;

    optimize(&mut tree);

    match rule_expr(&tree, "R") {
        Node::List(l) => {
            assert_eq!(l.kind, ListKind::UnorderedAlternate, "expected a pure switch, no residual ordered alternate");
            assert_eq!(l.items.len(), 3);
        }
        other => panic!("expected a list node, got {other:?}"),
    }
}

/// Each synthesized `PeekFor(Class)` guard must land in `Tree::classes`
/// under its own literal key — the generator's `classes` table and
/// `class_index` lookup are built purely from that map, so a class the
/// optimizer invents without interning it resolves to index 0 at codegen
/// time regardless of which byte it actually guards.
#[test]
fn synthesized_guard_classes_are_interned() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    for (lit, rhs) in [("a", "X"), ("b", "Y"), ("c", "Z")] {
        b.add_string(lit);
        b.add_name(rhs).unwrap();
        b.add_sequence().unwrap();
    }
    b.add_alternate().unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    tree.switch = true;
    assert_eq!(tree.classes().count(), 0, "grammar has no source class literals");

    optimize(&mut tree);

    let literals: Vec<&str> = tree.classes().map(|(k, _)| k).collect();
    assert_eq!(literals.len(), 3, "one interned class per disjoint branch guard");
    for (branch, byte) in [("X", b'a'), ("Y", b'b'), ("Z", b'c')] {
        let Node::List(l) = rule_expr(&tree, "R") else { panic!("expected a list") };
        let guard = l
            .items
            .iter()
            .find_map(|item| {
                let Node::List(seq) = item else { return None };
                let Node::List(peek) = &seq.items[0] else { return None };
                let Node::Token(class_tok) = &peek.items[0] else { return None };
                let Node::Name(n) = &seq.items[1] else { return None };
                (n.name == branch).then(|| class_tok.text.clone())
            })
            .unwrap_or_else(|| panic!("no guard found for branch {branch}"));
        let class = tree.class(&guard).unwrap_or_else(|| panic!("{guard:?} not interned"));
        assert!(class.has(byte));
    }
}

/// `decoded_first_byte` has to agree with [`crate::ast::CharacterClass::parse`]'s
/// own escape table, or a literal like `'\f'` would synthesize a FIRST-set
/// keyed on the wrong byte (`'f'` instead of 0x0c) and the resulting switch
/// would dispatch on the wrong case.
#[test]
fn decoded_first_byte_matches_class_parse_escapes() {
    assert_eq!(decoded_first_byte("\\a"), Some(0x07));
    assert_eq!(decoded_first_byte("\\b"), Some(0x08));
    assert_eq!(decoded_first_byte("\\f"), Some(0x0c));
    assert_eq!(decoded_first_byte("\\n"), Some(b'\n'));
    assert_eq!(decoded_first_byte("\\r"), Some(b'\r'));
    assert_eq!(decoded_first_byte("\\t"), Some(b'\t'));
    assert_eq!(decoded_first_byte("\\v"), Some(0x0b));
}

#[test]
fn overlapping_alternate_is_left_ordered() {
    // R = [a-m] X / [k-z] Y  — classes overlap in k..m, so neither branch is
    // disjoint from the other and nothing should be pulled into a switch.
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_class("a-m");
    b.add_name("X").unwrap();
    b.add_sequence().unwrap();
    b.add_class("k-z");
    b.add_name("Y").unwrap();
    b.add_sequence().unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    tree.switch = true;

    optimize(&mut tree);

    match rule_expr(&tree, "R") {
        Node::List(l) => assert_eq!(l.kind, ListKind::Alternate),
        other => panic!("expected a list node, got {other:?}"),
    }
}

#[test]
fn switch_disabled_leaves_tree_untouched() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_name("X").unwrap();
    b.add_sequence().unwrap();
    b.add_string("b");
    b.add_name("Y").unwrap();
    b.add_sequence().unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    assert!(!tree.switch);

    optimize(&mut tree);

    match rule_expr(&tree, "R") {
        Node::List(l) => assert_eq!(l.kind, ListKind::Alternate),
        other => panic!("expected a list node, got {other:?}"),
    }
}

#[test]
fn excluded_rule_is_not_retagged() {
    let mut b = Builder::new();
    b.switch_exclude("R");
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_name("X").unwrap();
    b.add_sequence().unwrap();
    b.add_string("b");
    b.add_name("Y").unwrap();
    b.add_sequence().unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    tree.switch = true;

    optimize(&mut tree);

    match rule_expr(&tree, "R") {
        Node::List(l) => assert_eq!(l.kind, ListKind::Alternate),
        other => panic!("expected a list node, got {other:?}"),
    }
}
