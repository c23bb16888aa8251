//! Alternate-to-switch optimization: optional, gated by
//! [`crate::ast::Tree::switch`], and run by the generator immediately before
//! lowering the start rule — only the start rule's transitive subtree is
//! optimized, and the pass mutates the tree (retags `Alternate` nodes to
//! `UnorderedAlternate`), so unlike the read-only passes in [`super::refs`]
//! and [`super::leftrec`] it always runs sequentially.
//!
//! For each subtree we synthesize a `(consumes, eof, peek, first-class)`
//! tuple (a [`FirstSet`]), then for each `Alternate` node compare branch
//! classes pairwise: if at least one pair is disjoint, branches that don't
//! intersect *any* sibling are pulled out into a byte-dispatch
//! `UnorderedAlternate`, each wrapped as `Sequence(PeekFor(class), branch)`;
//! a branch that does intersect some sibling stays behind in a residual
//! ordered `Alternate`.

use indexmap::IndexSet;

use crate::ast::{
    CharacterClass, ListKind, ListNode, Node, RuleId, TokenKind, TokenNode, Tree,
};

/// The synthesized FIRST-set tuple computed for every subtree.
#[derive(Debug, Clone)]
struct FirstSet {
    consumes: bool,
    eof: bool,
    peek: bool,
    class: CharacterClass,
}

impl FirstSet {
    fn empty() -> Self {
        FirstSet { consumes: false, eof: false, peek: false, class: CharacterClass::empty() }
    }

    /// Returned for a rule excluded from optimization ([`Tree::switch_exclude`])
    /// or one reached while still being computed (a recursive rule, broken
    /// conservatively rather than looping) — a tuple that always intersects
    /// any sibling, so it never drives a switch rewrite.
    fn identity() -> Self {
        FirstSet { consumes: true, eof: false, peek: false, class: CharacterClass::full() }
    }
}

struct OptCtx<'a> {
    tree: &'a Tree,
    exclude: &'a IndexSet<RuleId>,
    memo: Vec<Option<(FirstSet, Node)>>,
    in_progress: Vec<bool>,
    /// Literal/bitmap pairs for every synthesized `PeekFor(Class)` guard,
    /// interned into `Tree::classes` once the immutable walk below is done
    /// (the generator's `classes` table and `class_index` lookup are both
    /// built purely from `Tree::classes`, so a synthesized class that never
    /// gets interned resolves to index 0 at codegen time).
    synth_classes: Vec<(String, CharacterClass)>,
}

impl OptCtx<'_> {
    fn rule_first(&mut self, id: RuleId) -> FirstSet {
        if let Some((fs, _)) = &self.memo[id.index()] {
            return fs.clone();
        }
        if self.exclude.contains(&id) {
            let fs = FirstSet::identity();
            if let Some(rule) = self.tree.rule(id) {
                self.memo[id.index()] = Some((fs.clone(), rule.expr.clone()));
            }
            return fs;
        }
        if self.in_progress[id.index()] {
            return FirstSet::identity();
        }
        self.in_progress[id.index()] = true;
        let (fs, node) = match self.tree.rule(id) {
            Some(rule) => self.process_node(&rule.expr),
            None => (FirstSet::identity(), Node::Token(TokenNode::nil())),
        };
        self.in_progress[id.index()] = false;
        self.memo[id.index()] = Some((fs.clone(), node));
        fs
    }

    fn process_node(&mut self, node: &Node) -> (FirstSet, Node) {
        match node {
            Node::Token(t) => (token_first(t), Node::Token(t.clone())),
            Node::Name(n) => {
                let fs = match self.tree.rule_id(&n.name) {
                    Some(id) => self.rule_first(id),
                    None => FirstSet::identity(),
                };
                (fs, Node::Name(n.clone()))
            }
            Node::Action(a) => (FirstSet::empty(), Node::Action(a.clone())),
            Node::List(l) => self.process_list(l),
        }
    }

    fn process_list(&mut self, list: &ListNode) -> (FirstSet, Node) {
        match list.kind {
            ListKind::Alternate => self.process_alternate(list),
            ListKind::UnorderedAlternate => {
                let mut consumes = true;
                let mut eof = false;
                let mut peek = true;
                let mut class = CharacterClass::empty();
                let mut items = Vec::with_capacity(list.items.len());
                for child in &list.items {
                    let (fs, node) = self.process_node(child);
                    consumes &= fs.consumes;
                    eof |= fs.eof;
                    peek &= fs.peek;
                    class = class.union(&fs.class);
                    items.push(node);
                }
                (
                    FirstSet { consumes, eof, peek, class },
                    Node::List(ListNode { kind: ListKind::UnorderedAlternate, items }),
                )
            }
            ListKind::Sequence => self.process_sequence(list),
            ListKind::PeekFor => {
                let (fs, node) = self.process_node(&list.items[0]);
                (
                    FirstSet { consumes: false, eof: fs.eof, peek: true, class: fs.class },
                    Node::List(ListNode { kind: ListKind::PeekFor, items: vec![node] }),
                )
            }
            ListKind::PeekNot => {
                let (fs, node) = self.process_node(&list.items[0]);
                (
                    FirstSet {
                        consumes: false,
                        eof: !fs.eof,
                        peek: true,
                        class: fs.class.complement(),
                    },
                    Node::List(ListNode { kind: ListKind::PeekNot, items: vec![node] }),
                )
            }
            ListKind::Query | ListKind::Star => {
                let (fs, node) = self.process_node(&list.items[0]);
                (
                    FirstSet { consumes: false, eof: fs.eof, peek: fs.peek, class: fs.class },
                    Node::List(ListNode { kind: list.kind, items: vec![node] }),
                )
            }
            ListKind::Plus => {
                let (fs, node) = self.process_node(&list.items[0]);
                (fs, Node::List(ListNode { kind: ListKind::Plus, items: vec![node] }))
            }
        }
    }

    /// Scans left to right until a consuming element is found; the first
    /// class is the peek-aware combination (intersection for peeks, union
    /// otherwise) of that prefix. Remaining elements are still recursed into
    /// for their own optimization but don't feed this sequence's class.
    fn process_sequence(&mut self, list: &ListNode) -> (FirstSet, Node) {
        let mut items = Vec::with_capacity(list.items.len());
        let mut consumes = false;
        let mut eof = false;
        let mut class: Option<CharacterClass> = None;
        let mut found_consuming = false;

        for child in &list.items {
            let (fs, node) = self.process_node(child);
            items.push(node);
            if found_consuming {
                continue;
            }
            eof |= fs.eof;
            class = Some(match (class, fs.peek) {
                (None, _) => fs.class,
                (Some(prev), true) => prev.intersection(&fs.class),
                (Some(prev), false) => prev.union(&fs.class),
            });
            if fs.consumes {
                found_consuming = true;
                consumes = true;
            }
        }

        (
            FirstSet { consumes, eof, peek: false, class: class.unwrap_or_else(CharacterClass::empty) },
            Node::List(ListNode { kind: ListKind::Sequence, items }),
        )
    }

    fn process_alternate(&mut self, list: &ListNode) -> (FirstSet, Node) {
        let branches: Vec<(FirstSet, Node)> =
            list.items.iter().map(|c| self.process_node(c)).collect();

        let consumes = branches.iter().all(|(fs, _)| fs.consumes);
        let eof = branches.iter().any(|(fs, _)| fs.eof);
        let peek = branches.iter().all(|(fs, _)| fs.peek);
        let class = branches
            .iter()
            .fold(CharacterClass::empty(), |acc, (fs, _)| acc.union(&fs.class));
        let whole = FirstSet { consumes, eof, peek, class };

        if eof {
            let items = branches.into_iter().map(|(_, n)| n).collect();
            return (whole, Node::List(ListNode { kind: ListKind::Alternate, items }));
        }

        let n = branches.len();
        let is_residual: Vec<bool> = (0..n)
            .map(|i| {
                (0..n).any(|j| {
                    i != j && branches[i].0.class.intersects(&branches[j].0.class)
                })
            })
            .collect();

        if is_residual.iter().all(|&r| r) {
            // Every branch intersects some sibling — nothing to pull into a
            // switch, so leave the alternate ordered.
            let items = branches.into_iter().map(|(_, n)| n).collect();
            return (whole, Node::List(ListNode { kind: ListKind::Alternate, items }));
        }

        let mut best_idx = None;
        let mut best_len = -1i64;
        for (i, residual) in is_residual.iter().enumerate() {
            if *residual {
                continue;
            }
            let len = branches[i].0.class.len() as i64;
            if len > best_len {
                best_len = len;
                best_idx = Some(i);
            }
        }

        let mut residual = Vec::new();
        let mut head = Vec::new();
        let mut tail = Vec::new();
        let mut nils = Vec::new();

        for (i, (fs, node)) in branches.into_iter().enumerate() {
            if is_residual[i] {
                residual.push(node);
                continue;
            }
            let is_nil = matches!(&node, Node::Token(t) if t.kind == TokenKind::Nil);
            let literal = fs.class.to_literal();
            self.synth_classes.push((literal.clone(), fs.class));
            let wrapped = Node::List(ListNode {
                kind: ListKind::Sequence,
                items: vec![
                    Node::List(ListNode {
                        kind: ListKind::PeekFor,
                        items: vec![Node::Token(TokenNode::class(literal, fs.class))],
                    }),
                    node,
                ],
            });
            if is_nil {
                nils.push(wrapped);
            } else if Some(i) == best_idx {
                tail.push(wrapped);
            } else {
                head.push(wrapped);
            }
        }

        let mut unordered_items = head;
        unordered_items.extend(tail);
        unordered_items.extend(nils);
        let unordered = Node::List(ListNode { kind: ListKind::UnorderedAlternate, items: unordered_items });

        let result = if residual.is_empty() {
            unordered
        } else {
            residual.push(unordered);
            Node::List(ListNode { kind: ListKind::Alternate, items: residual })
        };

        (whole, result)
    }
}

fn token_first(t: &TokenNode) -> FirstSet {
    match t.kind {
        TokenKind::Dot => FirstSet { consumes: true, eof: false, peek: false, class: CharacterClass::full() },
        TokenKind::Character | TokenKind::String => {
            let mut class = CharacterClass::empty();
            if let Some(b) = decoded_first_byte(&t.text) {
                class.add(b);
            }
            FirstSet { consumes: true, eof: false, peek: false, class }
        }
        TokenKind::Class => FirstSet {
            consumes: true,
            eof: false,
            peek: false,
            class: t.class.unwrap_or_else(CharacterClass::empty),
        },
        TokenKind::Predicate | TokenKind::Commit | TokenKind::Begin | TokenKind::End | TokenKind::Nil => {
            FirstSet::empty()
        }
    }
}

/// The first byte a `Character`/`String` literal matches, after resolving a
/// single backslash escape (`\a \b \f \n \r \t \v` etc.), matching
/// [`CharacterClass::parse`]'s own escape handling for class literals.
fn decoded_first_byte(text: &str) -> Option<u8> {
    let mut chars = text.chars();
    match chars.next()? {
        '\\' => {
            let escaped = chars.next()?;
            Some(match escaped {
                'a' => 0x07,
                'b' => 0x08,
                'f' => 0x0c,
                'n' => b'\n',
                'r' => b'\r',
                't' => b'\t',
                'v' => 0x0b,
                other => other as u8,
            })
        }
        other => Some(other as u8),
    }
}

/// Runs the pass. A no-op unless `tree.switch` is set and the grammar has a
/// start rule.
pub fn optimize(tree: &mut Tree) {
    if !tree.switch {
        return;
    }
    let Some(start) = tree.start_rule() else {
        return;
    };

    let (memo, synth_classes) = {
        let exclude = tree.switch_exclude.clone();
        let n = tree.rules().len();
        let mut ctx = OptCtx {
            tree: &*tree,
            exclude: &exclude,
            memo: vec![None; n],
            in_progress: vec![false; n],
            synth_classes: Vec::new(),
        };
        ctx.rule_first(start);
        (ctx.memo, ctx.synth_classes)
    };

    for (literal, class) in synth_classes {
        tree.intern_class(&literal, class);
    }

    for (idx, entry) in memo.into_iter().enumerate() {
        if let Some((_, node)) = entry
            && let Some(rule) = tree.rule_mut(RuleId(idx as u32))
        {
            rule.expr = node;
        }
    }
}

#[cfg(test)]
mod altopt_tests;
