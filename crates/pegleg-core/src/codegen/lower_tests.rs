use super::*;
use crate::analyze::{altopt, analyze_sequential};
use crate::builder::Builder;

fn class_index_for(tree: &Tree) -> impl Fn(&str) -> usize + '_ {
    move |literal: &str| tree.classes().position(|(k, _)| k == literal).unwrap_or(0)
}

/// `R = 'a' 'b'` — a plain sequence of literals needs no backtrack labels
/// at all: nothing here can partially consume and then fail past the
/// first character.
#[test]
fn sequence_of_literals_has_no_labels() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_string("b");
    b.add_sequence().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert!(!body.contains("goto l"));
    assert!(body.contains("matchChar('a')"));
    assert!(
        body.find("matchChar('a')") < body.find("matchChar('b')"),
        "sequence elements must lower in source order: {body}"
    );
    assert!(body.contains("matchChar('b')"));
    assert!(body.contains("return true"));
}

/// `R = 'a' / 'b'` — an ordered choice needs exactly one fail label (for
/// the non-last branch) and a save/restore pair around it.
#[test]
fn alternate_emits_one_fail_label_with_position_save() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_string("b");
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert_eq!(body.matches("l0:").count(), 1);
    assert!(body.contains("position0 := position"));
    assert!(body.contains("position = position0"));
    // no actions anywhere in this rule: thunk position is never saved.
    assert!(!body.contains("thunkPosition0 :="));
}

/// A branch that embeds an action must save/restore `thunkPosition`; a
/// sibling branch with no action in it must not (testable property 7: the
/// dry pass only ever *over*-approximates, never misses a real need).
#[test]
fn only_branches_with_actions_save_thunk_position() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_action("yy = 1").unwrap();
    b.add_sequence().unwrap();
    b.add_string("b");
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert!(body.contains("thunkPosition0 := thunkPosition")); // rule-entry snapshot
    assert!(body.contains("p.do(0)"));
}

/// `R = [a-z]+` lowers to one mandatory match followed by a `Star`-shaped
/// repeat with its own `again`/`out` label pair.
#[test]
fn plus_lowers_to_match_then_loop() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_class("a-z");
    b.add_plus().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert_eq!(body.matches("matchClass(0)").count(), 2); // once mandatory, once in the loop
    assert!(body.contains("goto l")); // the loop's `again` jump
}

/// `R = &'a'` (peek-for a literal char) specializes to a direct peek with
/// no save/restore label at all.
#[test]
fn peek_for_character_has_no_save_restore() {
    let mut b = Builder::new();
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_peek_for().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert!(body.contains("peekChar('a')"));
    assert!(!body.contains("position0"));
}

/// `R = l:N ('+' N)*` with a capturing `Name` — captures emit
/// `doarg(yySet, slot)` using the slot the builder assigned.
#[test]
fn captured_name_emits_yyset_with_builder_slot() {
    let mut b = Builder::new();
    b.add_rule("N").unwrap();
    b.add_class("0-9");
    b.add_plus().unwrap();
    b.add_expression().unwrap();

    b.add_rule("R").unwrap();
    b.add_variable("l").unwrap();
    b.add_name("N").unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    assert_eq!(rule.variables.get("l").unwrap().slot, -1);
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();
    assert!(body.contains("p.doarg(yySet, -1)"));
}

/// `R = 'a' X / 'b' Y / 'c' Z` compiled with `switch=true`: after
/// optimization the generator emits a `switch` with one case per
/// first-byte-disjoint branch and no residual ordered `Alternate` (S5).
#[test]
fn switch_optimized_alternate_emits_switch_with_no_residual() {
    let mut b = Builder::new();
    for name in ["X", "Y", "Z"] {
        b.add_rule(name).unwrap();
        b.add_nil();
        b.add_expression().unwrap();
    }
    b.add_rule("R").unwrap();
    b.add_string("a");
    b.add_name("X").unwrap();
    b.add_sequence().unwrap();
    b.add_string("b");
    b.add_name("Y").unwrap();
    b.add_sequence().unwrap();
    b.add_alternate().unwrap();
    b.add_string("c");
    b.add_name("Z").unwrap();
    b.add_sequence().unwrap();
    b.add_alternate().unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    tree.switch = true;
    analyze_sequential(&mut tree);
    altopt::optimize(&mut tree);

    let rule = tree.rule(tree.rule_id("R").unwrap()).unwrap();
    assert!(matches!(rule.expr, Node::List(ref l) if l.kind == ListKind::UnorderedAlternate));

    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();
    assert!(body.contains("switch {"));
    assert_eq!(body.matches("case classMatches").count(), 3);

    // The optimizer must have interned each synthesized guard class (under
    // its own literal), not left `tree.classes()` empty — otherwise every
    // case above resolves through `class_index_for`'s `unwrap_or(0)` to the
    // same bogus index 0.
    assert_eq!(tree.classes().count(), 3);
    assert!(body.contains("case classMatches(0, p.Buffer[position]):"));
    assert!(body.contains("case classMatches(1, p.Buffer[position]):"));
    assert!(body.contains("case classMatches(2, p.Buffer[position]):"));
}

/// A rule referenced exactly once, with `inline` set, is spliced into the
/// caller rather than emitted as a `p.rules[ruleX]()` call (testable
/// property 6: inline equivalence).
#[test]
fn inlines_singly_referenced_rule() {
    let mut b = Builder::new();
    b.add_rule("Inner").unwrap();
    b.add_string("x");
    b.add_expression().unwrap();

    b.add_rule("Outer").unwrap();
    b.add_name("Inner").unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    tree.inline = true;
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("Outer").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert!(body.contains("matchChar('x')"));
    assert!(!body.contains("p.rules[ruleInner]"));
}

/// Without `inline`, the same grammar calls through the rules table.
#[test]
fn calls_through_rules_table_when_not_inlining() {
    let mut b = Builder::new();
    b.add_rule("Inner").unwrap();
    b.add_string("x");
    b.add_expression().unwrap();

    b.add_rule("Outer").unwrap();
    b.add_name("Inner").unwrap();
    b.add_expression().unwrap();
    let mut tree = b.finish().unwrap();
    analyze_sequential(&mut tree);

    let rule = tree.rule(tree.rule_id("Outer").unwrap()).unwrap();
    let idx = class_index_for(&tree);
    let body = lower_rule(&tree, rule, &idx).unwrap();

    assert!(body.contains("p.rules[ruleInner]()"));
}
