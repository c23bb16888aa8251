//! A shared read-only traversal for passes that only need to look at every
//! node once, no pass-specific control flow. The left-recursion pass and the
//! alternate/switch optimizer both carry control flow (entry/exit marking,
//! per-rule memoization, node rewriting) that doesn't fit this shape, so
//! they keep their own bespoke recursion instead of implementing `Visitor`.
//!
//! Overriding a `visit_*` method replaces its default (a no-op); if the
//! override still wants to recurse into children, it must call the matching
//! `walk_*` function itself — mirroring the convention the `visit_*`/`walk_*`
//! split normally uses.

use crate::ast::{ActionNode, ListNode, NameNode, Node, TokenNode};

pub trait Visitor {
    fn visit_name(&mut self, _node: &NameNode) {}
    fn visit_token(&mut self, _node: &TokenNode) {}
    fn visit_action(&mut self, _node: &ActionNode) {}
    fn visit_list(&mut self, node: &ListNode) {
        walk_list(self, node);
    }
}

pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Name(n) => visitor.visit_name(n),
        Node::Token(t) => visitor.visit_token(t),
        Node::Action(a) => visitor.visit_action(a),
        Node::List(l) => visitor.visit_list(l),
    }
}

pub fn walk_list<V: Visitor + ?Sized>(visitor: &mut V, list: &ListNode) {
    for child in &list.items {
        walk_node(visitor, child);
    }
}

#[cfg(test)]
mod visitor_tests;
