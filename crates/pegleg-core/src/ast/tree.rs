//! `Tree`: the top-level container a [`crate::builder::Builder`] fills in
//! and an [`crate::codegen`] generator reads back out.
//!
//! Invariants:
//! - **I1** rule ids are dense over `0..rules.len()`, assigned in declaration order.
//! - **I2** every `Name` that the builder has finished constructing resolves
//!   to a `RuleDef` in `rules` (possibly an empty placeholder — see
//!   `Builder::add_name`).
//! - **I3** action ids are dense over `0..actions.len()`, assigned in the
//!   order `AddAction` was called.
//! - **I4** `classes` keys are the canonical literal form of each distinct
//!   class that appeared in the grammar, each appearing once.
//! - **I5** `rules` iterates in declaration order, which is also the order
//!   the generator emits rule bodies in.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::node::{ActionId, ActionNode, Node, RuleDef, RuleId};

/// The `Define` directives a grammar may set: host-language package name,
/// the generated recognizer type's name, the user-state and semantic-value
/// type names, and whether the grammar should be excluded from whatever
/// export surface the host module system has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directives {
    pub package: Option<String>,
    pub peg_type: Option<String>,
    pub userstate: Option<String>,
    pub yystype: Option<String>,
    pub noexport: bool,
}

/// Per-rule reference count, filled in by the rule-reference analysis pass.
/// `0` means the rule is declared but unreachable from the start rule.
pub type RefCounts = Vec<u32>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Declared rules, dense and in declaration order (I1, I5).
    rules: Vec<RuleDef>,
    /// Name -> id lookup, insertion-ordered to match `rules`.
    rule_index: IndexMap<String, RuleId>,

    /// Verbatim host-language text blocks to splice before/after the
    /// generated recognizer (`%{ ... %}` headers, trailers).
    pub headers: Vec<String>,
    pub trailers: Vec<String>,

    /// Embedded action blocks, dense and in call order (I3).
    actions: Vec<ActionNode>,

    /// Distinct character classes keyed by canonical literal text (I4).
    classes: IndexMap<String, super::charclass::CharacterClass>,

    pub directives: Directives,

    /// Inline rules referenced exactly once, during `Name` lowering.
    pub inline: bool,
    /// Run the alternate/switch optimization pass.
    pub switch: bool,

    /// Rules the alternate/switch optimization pass should not retag,
    /// because the front-end or a directive asked for ordered semantics to
    /// be preserved verbatim.
    pub switch_exclude: IndexSet<RuleId>,

    /// Per-rule reference counts, populated by `analyze`. `None` before the
    /// rule-reference pass has run.
    pub(crate) ref_counts: Option<RefCounts>,

    /// Operand stack the builder pushes completed sub-expressions onto.
    pub(crate) build_stack: Vec<Node>,
    /// State for whichever rule `AddRule` most recently opened, cleared by
    /// `AddExpression`.
    pub(crate) current_rule: Option<CurrentRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CurrentRule {
    pub id: RuleId,
    pub name: String,
    pub has_actions: bool,
    pub variables: IndexMap<String, super::node::Variable>,
    /// Set by `AddVariable`, consumed by the next `AddName`.
    pub pending_capture: Option<String>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[RuleDef] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&RuleDef> {
        self.rules.get(id.index())
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&RuleDef> {
        self.rule_index.get(name).and_then(|id| self.rule(*id))
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_index.get(name).copied()
    }

    /// The first declared rule, treated as the grammar's start symbol unless
    /// the emitted parser's caller names another `Parse` entry point
    /// explicitly.
    pub fn start_rule(&self) -> Option<RuleId> {
        self.rules.first().map(|r| r.id)
    }

    pub fn actions(&self) -> &[ActionNode] {
        &self.actions
    }

    pub fn action(&self, id: ActionId) -> Option<&ActionNode> {
        self.actions.get(id.0 as usize)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &super::charclass::CharacterClass)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn class(&self, literal: &str) -> Option<&super::charclass::CharacterClass> {
        self.classes.get(literal)
    }

    pub fn ref_counts(&self) -> Option<&RefCounts> {
        self.ref_counts.as_ref()
    }

    /// Mutable access to a rule's expression tree, used by the
    /// alternate/switch optimization pass to retag `Alternate` nodes to
    /// `UnorderedAlternate` in place.
    pub(crate) fn rule_mut(&mut self, id: RuleId) -> Option<&mut RuleDef> {
        self.rules.get_mut(id.index())
    }

    /// Installs the rule-reference pass's output. Called once by
    /// [`crate::analyze::analyze`].
    pub(crate) fn set_ref_counts(&mut self, counts: RefCounts) {
        self.ref_counts = Some(counts);
    }

    // --- builder-facing mutators, crate-internal ---

    pub(crate) fn next_rule_id(&self) -> RuleId {
        RuleId(self.rules.len() as u32)
    }

    pub(crate) fn next_action_id(&self) -> ActionId {
        ActionId(self.actions.len() as u32)
    }

    pub(crate) fn push_action(&mut self, action: ActionNode) {
        self.actions.push(action);
    }

    pub(crate) fn rule_exists(&self, name: &str) -> bool {
        self.rule_index.contains_key(name)
    }

    /// Registers a forward-reference placeholder (a `Name` targeting a rule
    /// not yet declared, or never declared — invariant I2's "possibly an
    /// empty placeholder" case). Returns the existing id if already present.
    pub(crate) fn intern_placeholder_rule(&mut self, name: &str) -> RuleId {
        if let Some(&id) = self.rule_index.get(name) {
            return id;
        }
        let id = self.next_rule_id();
        self.rule_index.insert(name.to_string(), id);
        self.rules.push(RuleDef {
            id,
            name: name.to_string(),
            expr: Node::Token(super::node::TokenNode::nil()),
            has_actions: false,
            variables: IndexMap::new(),
        });
        id
    }

    pub(crate) fn intern_class(&mut self, literal: &str, class: super::charclass::CharacterClass) {
        self.classes.entry(literal.to_string()).or_insert(class);
    }

    pub(crate) fn finish_rule(&mut self, rule: CurrentRule, expr: Node) {
        let entry = RuleDef {
            id: rule.id,
            name: rule.name.clone(),
            expr,
            has_actions: rule.has_actions,
            variables: rule.variables,
        };
        if let Some(slot) = self.rules.get_mut(rule.id.index()) {
            *slot = entry;
        } else {
            self.rules.push(entry);
        }
        self.rule_index.insert(rule.name, rule.id);
    }
}

#[cfg(test)]
mod tree_tests;
