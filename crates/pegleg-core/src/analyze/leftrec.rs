//! Left-recursion pass.
//!
//! For each rule, a DFS determines whether its expression is *consuming*
//! (could not possibly succeed without advancing the input position). The
//! recursion into a `Name`'s target rule marks that rule "in progress" for
//! the duration of the call; re-entering an in-progress rule along the same
//! call path is the textbook left-recursion shape (`R = R α`, `α` possibly
//! empty) and is reported once per rule.
//!
//! `Sequence` short-circuits left-to-right on the first consuming element,
//! matching the reference PEG-compiler behavior this pass is grounded on:
//! without short-circuiting, evaluating every element of `'a' R` (legitimate
//! *right* recursion, not left) would still walk into `R` while `'a'`'s
//! sibling slot is being resolved, flagging a false cycle. Only the leftmost
//! non-consuming prefix of a sequence can actually be left-recursive.

use crate::ast::{ListKind, Node, RuleId, TokenKind, Tree};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

struct Walker<'a> {
    tree: &'a Tree,
    in_progress: Vec<bool>,
    resolved: Vec<Option<bool>>,
    diags: Diagnostics,
}

impl Walker<'_> {
    fn consumes_rule(&mut self, id: RuleId) -> bool {
        if let Some(result) = self.resolved[id.index()] {
            return result;
        }
        if self.in_progress[id.index()] {
            let name = self.tree.rule(id).map(|r| r.name.clone());
            self.diags.push_error(DiagnosticKind::InfiniteLeftRecursion, name);
            return false;
        }
        let Some(rule) = self.tree.rule(id) else {
            return false;
        };
        self.in_progress[id.index()] = true;
        let result = self.consumes_node(&rule.expr);
        self.in_progress[id.index()] = false;
        self.resolved[id.index()] = Some(result);
        result
    }

    fn consumes_node(&mut self, node: &Node) -> bool {
        match node {
            Node::Token(t) => match t.kind {
                TokenKind::Character | TokenKind::String => !t.text.is_empty(),
                TokenKind::Dot | TokenKind::Class => true,
                TokenKind::Predicate
                | TokenKind::Commit
                | TokenKind::Begin
                | TokenKind::End
                | TokenKind::Nil => false,
            },
            Node::Action(_) => false,
            Node::Name(n) => match self.tree.rule_id(&n.name) {
                Some(id) => self.consumes_rule(id),
                None => false,
            },
            Node::List(l) => match l.kind {
                // Every branch starts at the rule's own left position, so
                // each is walked regardless of its siblings' results — unlike
                // `Sequence` below, there is no short-circuiting here.
                ListKind::Alternate | ListKind::UnorderedAlternate => {
                    let mut all_consume = true;
                    for child in &l.items {
                        if !self.consumes_node(child) {
                            all_consume = false;
                        }
                    }
                    all_consume
                }
                ListKind::Sequence => l.items.iter().any(|c| self.consumes_node(c)),
                ListKind::Plus => l.items.first().is_some_and(|c| self.consumes_node(c)),
                ListKind::Query | ListKind::Star | ListKind::PeekFor | ListKind::PeekNot => false,
            },
        }
    }
}

/// Runs the pass over every declared rule, returning the diagnostics it
/// produced. Rules are independent starting points, but the `resolved`
/// memo table is shared so a rule reached from two different start points
/// is only walked once.
pub fn run(tree: &Tree) -> Diagnostics {
    let n = tree.rules().len();
    let mut walker = Walker {
        tree,
        in_progress: vec![false; n],
        resolved: vec![None; n],
        diags: Diagnostics::new(),
    };
    for rule in tree.rules() {
        walker.consumes_rule(rule.id);
    }
    walker.diags
}

#[cfg(test)]
mod leftrec_tests;
