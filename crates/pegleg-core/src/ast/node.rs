//! The grammar AST node types.
//!
//! This is one tagged `enum Node` rather than a marker-supertype with narrow
//! subinterfaces: every node kind carries its payload directly, and shared
//! shapes (the eight single-child/list-child constructs, the nine
//! token-like leaves) are collapsed into one payload struct apiece
//! distinguished by an inner kind tag. `Variable` is not a distinct node
//! wrapping `Name`: capture is a field of `Name` itself, so we count it as a
//! tag on capturing `Name` nodes (see [`NodeKind::Variable`] and
//! `Name::capture`) rather than inventing a wrapper with no other payload.

use serde::{Deserialize, Serialize};

/// Dense, zero-based identifier for a declared rule: ids are assigned in
/// declaration order with no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a rule-local captured variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub u32);

/// Identifier for an embedded action block: ids are assigned in the order
/// `add_action` is called, across the whole tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u32);

/// Every node kind the grammar AST distinguishes, used by the type-count
/// pass to tag occurrences regardless of which [`Node`] payload variant
/// produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Rule,
    Variable,
    Name,
    Dot,
    Character,
    String,
    Class,
    Predicate,
    Commit,
    Begin,
    End,
    Action,
    Alternate,
    UnorderedAlternate,
    Sequence,
    PeekFor,
    PeekNot,
    Query,
    Star,
    Plus,
    Nil,
}

/// The nine token-like leaves: no children, distinguished by `kind`, with an
/// optional literal payload (`text` for `Character`/`String`/`Predicate`,
/// `class` for `Class`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Dot,
    Character,
    String,
    Class,
    Predicate,
    Commit,
    Begin,
    End,
    Nil,
}

use super::charclass::CharacterClass;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenNode {
    pub kind: TokenKind,
    /// Verbatim source text for `Character`/`String`/`Predicate`; empty for
    /// the other kinds.
    pub text: String,
    /// Populated only for `Class`.
    pub class: Option<CharacterClass>,
}

impl TokenNode {
    pub fn dot() -> Self {
        TokenNode { kind: TokenKind::Dot, text: String::new(), class: None }
    }

    pub fn commit() -> Self {
        TokenNode { kind: TokenKind::Commit, text: String::new(), class: None }
    }

    pub fn begin() -> Self {
        TokenNode { kind: TokenKind::Begin, text: String::new(), class: None }
    }

    pub fn end() -> Self {
        TokenNode { kind: TokenKind::End, text: String::new(), class: None }
    }

    pub fn nil() -> Self {
        TokenNode { kind: TokenKind::Nil, text: String::new(), class: None }
    }

    pub fn character(text: impl Into<String>) -> Self {
        TokenNode { kind: TokenKind::Character, text: text.into(), class: None }
    }

    pub fn string(text: impl Into<String>) -> Self {
        TokenNode { kind: TokenKind::String, text: text.into(), class: None }
    }

    pub fn predicate(text: impl Into<String>) -> Self {
        TokenNode { kind: TokenKind::Predicate, text: text.into(), class: None }
    }

    pub fn class(literal: impl Into<String>, class: CharacterClass) -> Self {
        TokenNode { kind: TokenKind::Class, text: literal.into(), class: Some(class) }
    }
}

/// The eight single-or-list-child constructs: ordered choice, unordered
/// (switch-optimized) choice, sequence, the two syntactic predicates, the
/// optional/star/plus quantifiers. `Sequence`/`Alternate`/`UnorderedAlternate`
/// hold an arbitrary-length list of children; the quantifiers and
/// predicates hold exactly one (enforced by the builder, not the type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Alternate,
    UnorderedAlternate,
    Sequence,
    PeekFor,
    PeekNot,
    Query,
    Star,
    Plus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNode {
    pub kind: ListKind,
    pub items: Vec<Node>,
}

/// A non-terminal reference. `capture` is set when this occurrence was
/// preceded by `AddVariable` and therefore binds the referenced rule's
/// result into a rule-local variable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameNode {
    pub name: String,
    pub capture: Option<VariableId>,
}

/// An embedded action block. `rule` and `id` let the generator and the
/// host-language emitter locate the action's slot in the per-rule
/// `variables` table and in the tree-wide action list (invariant I3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionNode {
    pub id: ActionId,
    pub rule: RuleId,
    pub text: String,
}

/// One grammar expression node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Name(NameNode),
    Token(TokenNode),
    List(ListNode),
    Action(ActionNode),
}

impl Node {
    /// The [`NodeKind`] tag this node counts as, honoring the `Variable`
    /// tag for capturing `Name` occurrences (see module docs).
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Name(n) if n.capture.is_some() => NodeKind::Variable,
            Node::Name(_) => NodeKind::Name,
            Node::Token(t) => token_node_kind(t.kind),
            Node::List(l) => list_node_kind(l.kind),
            Node::Action(_) => NodeKind::Action,
        }
    }

    /// Read-only children, in evaluation order. Token leaves have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::List(l) => &l.items,
            _ => &[],
        }
    }
}

/// The [`NodeKind`] a [`TokenKind`] always counts as.
pub fn token_node_kind(kind: TokenKind) -> NodeKind {
    match kind {
        TokenKind::Dot => NodeKind::Dot,
        TokenKind::Character => NodeKind::Character,
        TokenKind::String => NodeKind::String,
        TokenKind::Class => NodeKind::Class,
        TokenKind::Predicate => NodeKind::Predicate,
        TokenKind::Commit => NodeKind::Commit,
        TokenKind::Begin => NodeKind::Begin,
        TokenKind::End => NodeKind::End,
        TokenKind::Nil => NodeKind::Nil,
    }
}

/// The [`NodeKind`] a [`ListKind`] always counts as.
pub fn list_node_kind(kind: ListKind) -> NodeKind {
    match kind {
        ListKind::Alternate => NodeKind::Alternate,
        ListKind::UnorderedAlternate => NodeKind::UnorderedAlternate,
        ListKind::Sequence => NodeKind::Sequence,
        ListKind::PeekFor => NodeKind::PeekFor,
        ListKind::PeekNot => NodeKind::PeekNot,
        ListKind::Query => NodeKind::Query,
        ListKind::Star => NodeKind::Star,
        ListKind::Plus => NodeKind::Plus,
    }
}

/// A rule-local captured variable: its declared name and the stack-slot
/// offset the generator assigns during lowering (negative, relative to the
/// rule's frame pointer; `0` until assigned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub slot: i32,
}

/// One declared rule: its name, dense id, single expression child, whether
/// it contains any embedded actions, and its captured-variable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: RuleId,
    pub name: String,
    pub expr: Node,
    pub has_actions: bool,
    pub variables: indexmap::IndexMap<String, Variable>,
}

impl RuleDef {
    /// True for a rule that was referenced (`add_name`/`switch_exclude`) but
    /// never itself completed with `add_rule` + `add_expression` — the "used
    /// but not defined" case. The generator emits such a rule's table entry
    /// as `nil`.
    pub fn is_undefined(&self) -> bool {
        matches!(&self.expr, Node::Token(t) if t.kind == TokenKind::Nil) && !self.has_actions
    }
}

#[cfg(test)]
mod node_tests;
