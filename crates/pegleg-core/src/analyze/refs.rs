//! Rule-reference pass.
//!
//! Starting from the start rule (the first declared rule), a DFS follows
//! `Name` edges through rule bodies. Every `Name` encountered bumps the
//! target rule's reference count; a rule already visited in this DFS is not
//! recursed into again (only its count is bumped) — this is what keeps the
//! walk terminating on a grammar with cycles.
//!
//! A rule whose body was never completed with `AddExpression` is reported
//! "used but not defined" regardless of reachability. A rule that is never
//! reached from the start rule (and isn't the start rule itself) is reported
//! "defined but not used".

use crate::ast::{ListNode, NameNode, Tree};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::visitor::{walk_list, Visitor};

/// Dense per-rule reference counts, indexed by [`RuleId`].
pub type RefCounts = Vec<u32>;

struct RefWalker<'a> {
    tree: &'a Tree,
    counts: &'a mut RefCounts,
    visited: &'a mut [bool],
}

impl Visitor for RefWalker<'_> {
    fn visit_name(&mut self, node: &NameNode) {
        let Some(id) = self.tree.rule_id(&node.name) else {
            return;
        };
        self.counts[id.index()] += 1;
        if !self.visited[id.index()] {
            self.visited[id.index()] = true;
            if let Some(rule) = self.tree.rule(id) {
                super::visitor::walk_node(self, &rule.expr);
            }
        }
    }

    fn visit_list(&mut self, node: &ListNode) {
        walk_list(self, node);
    }
}

/// Runs the pass, returning the union of its diagnostics and the filled-in
/// reference-count table.
pub fn run(tree: &Tree) -> (Diagnostics, RefCounts) {
    let n = tree.rules().len();
    let mut counts: RefCounts = vec![0; n];
    let mut visited = vec![false; n];
    let mut diags = Diagnostics::new();

    let start = tree.start_rule();
    if let Some(start) = start {
        visited[start.index()] = true;
        if let Some(rule) = tree.rule(start) {
            let mut walker = RefWalker { tree, counts: &mut counts, visited: &mut visited };
            super::visitor::walk_node(&mut walker, &rule.expr);
        }
    }

    for rule in tree.rules() {
        if rule.is_undefined() {
            diags.push_error(DiagnosticKind::UndefinedRule, rule.name.clone());
            continue;
        }
        let is_start = start == Some(rule.id);
        if !is_start && counts[rule.id.index()] == 0 {
            diags.push_warning(DiagnosticKind::UnusedRule, rule.name.clone());
        }
    }

    (diags, counts)
}

#[cfg(test)]
mod refs_tests;
