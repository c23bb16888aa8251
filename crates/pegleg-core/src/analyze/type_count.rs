//! Type-count pass: walks every rule's expression tree once, counting
//! occurrences by node kind. The counts gate which helpers the generator
//! emits (e.g. `matchDot` only if `TypeDot > 0`).

use indexmap::IndexMap;

use crate::ast::{
    list_node_kind, token_node_kind, ActionNode, ListNode, NameNode, NodeKind, Tree,
};

use super::visitor::{walk_list, Visitor};

/// Occurrence counts by [`NodeKind`], gathered across every declared rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCounts {
    counts: IndexMap<NodeKind, u32>,
}

impl TypeCounts {
    pub fn get(&self, kind: NodeKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn any(&self, kind: NodeKind) -> bool {
        self.get(kind) > 0
    }
}

struct Counter<'a> {
    counts: &'a mut IndexMap<NodeKind, u32>,
}

impl Counter<'_> {
    fn bump(&mut self, kind: NodeKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }
}

impl Visitor for Counter<'_> {
    fn visit_name(&mut self, node: &NameNode) {
        self.bump(if node.capture.is_some() {
            NodeKind::Variable
        } else {
            NodeKind::Name
        });
    }

    fn visit_token(&mut self, node: &crate::ast::TokenNode) {
        self.bump(token_node_kind(node.kind));
    }

    fn visit_action(&mut self, _node: &ActionNode) {
        self.bump(NodeKind::Action);
    }

    fn visit_list(&mut self, node: &ListNode) {
        self.bump(list_node_kind(node.kind));
        walk_list(self, node);
    }
}

/// Runs the type-count pass over every declared rule in `tree`.
pub fn count(tree: &Tree) -> TypeCounts {
    let mut counts = IndexMap::new();
    {
        let mut counter = Counter { counts: &mut counts };
        for rule in tree.rules() {
            counter.bump(NodeKind::Rule);
            super::visitor::walk_node(&mut counter, &rule.expr);
        }
    }
    TypeCounts { counts }
}

#[cfg(test)]
mod type_count_tests;
