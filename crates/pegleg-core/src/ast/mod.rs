//! The grammar AST: node types, byte-valued character classes, and the
//! `Tree` container the builder fills in.

mod charclass;
mod node;
mod tree;

pub use charclass::CharacterClass;
pub use node::{
    list_node_kind, token_node_kind, ActionId, ActionNode, ListKind, ListNode, NameNode, Node,
    NodeKind, RuleDef, RuleId, TokenKind, TokenNode, Variable, VariableId,
};
pub use tree::{Directives, RefCounts, Tree};

pub(crate) use tree::CurrentRule;
