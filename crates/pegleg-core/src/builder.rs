//! The builder API: the single stack-discipline interface a front-end uses
//! to assemble rules, expressions, actions, headers, and directives into a
//! [`Tree`].
//!
//! The stack is modeled as an explicit `Vec<Node>` of one enum rather than a
//! stack of a base trait — there is no downcasting anywhere in this module.

use crate::ast::{
    ActionNode, CharacterClass, ListKind, ListNode, NameNode, Node, TokenNode, Tree, Variable,
};
use crate::ast::CurrentRule;
use crate::error::{BuilderError, BuilderResult};

/// Wraps a [`Tree`] under construction and exposes the builder verbs.
///
/// A `Builder` is the only way a front-end should populate a `Tree` — the
/// `Tree`'s own mutating methods are crate-private precisely so the stack
/// discipline below is the sole entry point.
#[derive(Debug, Default)]
pub struct Builder {
    tree: Tree,
}

impl Builder {
    pub fn new() -> Self {
        Builder { tree: Tree::new() }
    }

    fn current_rule_mut(&mut self) -> BuilderResult<&mut CurrentRule> {
        self.tree.current_rule.as_mut().ok_or(BuilderError::NoCurrentRule)
    }

    fn pop(&mut self) -> BuilderResult<Node> {
        self.tree.build_stack.pop().ok_or(BuilderError::EmptyStack)
    }

    fn push(&mut self, node: Node) {
        self.tree.build_stack.push(node);
    }

    /// `AddRule(name)`: push a fresh rule with the next dense id.
    pub fn add_rule(&mut self, name: impl Into<String>) -> BuilderResult<()> {
        let name = name.into();
        if let Some(open) = &self.tree.current_rule {
            return Err(BuilderError::UnterminatedRule(open.name.clone()));
        }
        let id = match self.tree.rule_by_name(&name) {
            Some(existing) if !existing.is_undefined() => {
                return Err(BuilderError::DuplicateRule(name));
            }
            Some(existing) => existing.id,
            None => self.tree.next_rule_id(),
        };
        self.tree.current_rule = Some(CurrentRule {
            id,
            name,
            has_actions: false,
            variables: Default::default(),
            pending_capture: None,
        });
        Ok(())
    }

    /// `AddExpression()`: pop an expression, pop the open rule, attach, and
    /// append the rule to the ordered rule list.
    pub fn add_expression(&mut self) -> BuilderResult<()> {
        let expr = self.pop()?;
        let rule = self.tree.current_rule.take().ok_or(BuilderError::NoCurrentRule)?;
        self.tree.finish_rule(rule, expr);
        Ok(())
    }

    /// `AddName(n)`: push `Name(n)`, binding any pending variable capture,
    /// ensuring `rules[n]` exists (as an empty placeholder if new).
    pub fn add_name(&mut self, name: impl Into<String>) -> BuilderResult<()> {
        let name = name.into();
        self.tree.intern_placeholder_rule(&name);

        let capture_id = match self.current_rule_mut()?.pending_capture.take() {
            Some(var_name) => {
                let cur = self.current_rule_mut()?;
                let index = match cur.variables.get_index_of(&var_name) {
                    Some(index) => index,
                    None => {
                        let slot = -(cur.variables.len() as i32 + 1);
                        let (index, _) = cur
                            .variables
                            .insert_full(var_name.clone(), Variable { name: var_name, slot });
                        index
                    }
                };
                Some(crate::ast::VariableId(index as u32))
            }
            None => None,
        };
        self.push(Node::Name(NameNode { name, capture: capture_id }));
        Ok(())
    }

    /// `AddVariable(n)`: record that the next `Name` pushed captures into
    /// variable `n` of the current rule.
    pub fn add_variable(&mut self, name: impl Into<String>) -> BuilderResult<()> {
        let cur = self.current_rule_mut()?;
        cur.pending_capture = Some(name.into());
        Ok(())
    }

    pub fn add_dot(&mut self) {
        self.push(Node::Token(TokenNode::dot()));
    }

    pub fn add_begin(&mut self) {
        self.push(Node::Token(TokenNode::begin()));
    }

    pub fn add_end(&mut self) {
        self.push(Node::Token(TokenNode::end()));
    }

    pub fn add_commit(&mut self) {
        self.push(Node::Token(TokenNode::commit()));
    }

    pub fn add_nil(&mut self) {
        self.push(Node::Token(TokenNode::nil()));
    }

    /// `AddString(s)`: push `Character(s)` if `s` is one raw char or a
    /// two-char escape, else `String(s)`.
    pub fn add_string(&mut self, s: impl Into<String>) {
        let s = s.into();
        let is_char = {
            let mut chars = s.chars();
            match chars.next() {
                Some('\\') => chars.next().is_some() && chars.next().is_none(),
                Some(_) => chars.next().is_none(),
                None => false,
            }
        };
        if is_char {
            self.push(Node::Token(TokenNode::character(s)));
        } else {
            self.push(Node::Token(TokenNode::string(s)));
        }
    }

    /// `AddClass(s)`: push `Class(s)`, parsing and registering the class on
    /// first sight under key `s` (invariant I4).
    pub fn add_class(&mut self, s: impl Into<String>) {
        let s = s.into();
        let class = self
            .tree
            .class(&s)
            .copied()
            .unwrap_or_else(|| CharacterClass::parse(&s));
        self.tree.intern_class(&s, class);
        self.push(Node::Token(TokenNode::class(s, class)));
    }

    /// `AddAction(text)`: rewrite `$$` to `yy`, attach to the current rule,
    /// append to the action list, mark the rule `hasActions`, push.
    pub fn add_action(&mut self, text: impl Into<String>) -> BuilderResult<()> {
        let text = text.into().replace("$$", "yy");
        let id = self.tree.next_action_id();
        let rule_id = self.current_rule_mut()?.id;
        self.current_rule_mut()?.has_actions = true;
        self.tree.push_action(ActionNode { id, rule: rule_id, text: text.clone() });
        self.push(Node::Action(ActionNode { id, rule: rule_id, text }));
        Ok(())
    }

    /// `AddPredicate(t)`: push `Predicate(t)` verbatim.
    pub fn add_predicate(&mut self, text: impl Into<String>) {
        self.push(Node::Token(TokenNode::predicate(text)));
    }

    /// `b` is the most recently pushed operand (popped first), `a` the one
    /// pushed before it, so `[a, b]` is source order. Flattening has to
    /// handle either accumulator shape a front-end may produce: a left fold
    /// (`push(a); push(b); add_list()` repeated — the growing list is
    /// always `a`) appends `b` to it, while a right-to-left reduction (items
    /// pushed independently, then combined from the stack top down — the
    /// growing list ends up as `b`) prepends `a` to it. Neither case nests a
    /// fresh list inside one that already carries the same tag.
    fn add_list(&mut self, kind: ListKind) -> BuilderResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        let merged = match (a, b) {
            (Node::List(mut la), b) if la.kind == kind => {
                la.items.push(b);
                Node::List(la)
            }
            (a, Node::List(mut lb)) if lb.kind == kind => {
                lb.items.insert(0, a);
                Node::List(lb)
            }
            (a, b) => Node::List(ListNode { kind, items: vec![a, b] }),
        };
        self.push(merged);
        Ok(())
    }

    /// `AddAlternate`: pop `b, a`; flatten into an existing `Alternate` on
    /// either side (see [`Builder::add_list`]), else wrap `[a, b]` fresh.
    pub fn add_alternate(&mut self) -> BuilderResult<()> {
        self.add_list(ListKind::Alternate)
    }

    /// `AddSequence`: same merge rule, tagged `Sequence`.
    pub fn add_sequence(&mut self) -> BuilderResult<()> {
        self.add_list(ListKind::Sequence)
    }

    fn wrap_one(&mut self, kind: ListKind) -> BuilderResult<()> {
        let x = self.pop()?;
        self.push(Node::List(ListNode { kind, items: vec![x] }));
        Ok(())
    }

    pub fn add_peek_for(&mut self) -> BuilderResult<()> {
        self.wrap_one(ListKind::PeekFor)
    }

    pub fn add_peek_not(&mut self) -> BuilderResult<()> {
        self.wrap_one(ListKind::PeekNot)
    }

    pub fn add_query(&mut self) -> BuilderResult<()> {
        self.wrap_one(ListKind::Query)
    }

    pub fn add_star(&mut self) -> BuilderResult<()> {
        self.wrap_one(ListKind::Star)
    }

    pub fn add_plus(&mut self) -> BuilderResult<()> {
        self.wrap_one(ListKind::Plus)
    }

    /// `Define(k, v)`: set a recognized directive, silently ignoring unknown keys.
    pub fn define(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "package" => self.tree.directives.package = Some(value),
            "Peg" => self.tree.directives.peg_type = Some(value),
            "userstate" => self.tree.directives.userstate = Some(value),
            "YYSTYPE" | "yystype" => self.tree.directives.yystype = Some(value),
            "noexport" => self.tree.directives.noexport = true,
            "inline" => self.tree.inline = value != "false",
            "switch" => self.tree.switch = value != "false",
            _ => {}
        }
    }

    /// `SwitchExclude(rule)`: mark a rule ineligible for switch optimization.
    pub fn switch_exclude(&mut self, rule: impl Into<String>) {
        let rule = rule.into();
        let id = self.tree.intern_placeholder_rule(&rule);
        self.tree.switch_exclude.insert(id);
    }

    pub fn add_header(&mut self, text: impl Into<String>) {
        self.tree.headers.push(text.into());
    }

    pub fn add_trailer(&mut self, text: impl Into<String>) {
        self.tree.trailers.push(text.into());
    }

    /// Finalizes construction, checking the invariants the builder itself
    /// owns: no rule left open, and the expression stack balanced empty.
    pub fn finish(self) -> BuilderResult<Tree> {
        if let Some(open) = &self.tree.current_rule {
            return Err(BuilderError::UnterminatedRule(open.name.clone()));
        }
        if !self.tree.build_stack.is_empty() {
            return Err(BuilderError::UnbalancedStack(self.tree.build_stack.len()));
        }
        Ok(self.tree)
    }
}

#[cfg(test)]
mod builder_tests;
