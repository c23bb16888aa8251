//! Per-construct lowering and the two-pass dry/real emission strategy that
//! drives it.
//!
//! [`lower_rule`] runs the exact same recursive descent over a rule's
//! expression tree twice: once into a dry, no-op [`Emitter`] purely to
//! populate [`LabelTable`]'s `save_pos`/`save_thunk` flags, then again into
//! a real `Emitter` that consults those flags to decide whether a given
//! backtrack point actually needs to snapshot (and later restore) input
//! position and/or action-thunk position.
//!
//! Position is conservatively always saved at a backtrack point (the save
//! is cheap and every choice/repeat genuinely can move the read cursor).
//! Thunk position is the flag that earns its keep: [`Ctx::thunk_stack`]
//! tracks, per nested backtrack scope, whether an [`Action`](crate::ast::Node::Action)
//! was lowered since the scope's matching save — a branch of plain literals
//! never dirties the thunk buffer, so its restore site skips the
//! `thunkPosition` snapshot entirely.

use crate::ast::{ListKind, Node, NodeKind, RuleDef, TokenKind, TokenNode, Tree};
use crate::error::{CodegenError, CodegenResult};

use super::emitter::Emitter;
use super::label::{Label, LabelTable};

/// Where a failed match should transfer control.
#[derive(Debug, Clone, Copy)]
enum Ko {
    /// `goto l<N>`.
    Label(Label),
    /// `return false` — nothing upstream is prepared to retry, so there is
    /// nothing to jump back to.
    Fail,
}

struct Ctx<'a> {
    tree: &'a Tree,
    rule: &'a RuleDef,
    class_index: &'a dyn Fn(&str) -> usize,
    out: Emitter,
    labels: LabelTable,
    dry: bool,
    /// One entry per currently-open backtrack scope (innermost last); set
    /// to `true` when an `Action` is lowered anywhere inside that scope.
    thunk_stack: Vec<bool>,
}

impl Ctx<'_> {
    fn fresh_label(&mut self) -> Label {
        self.labels.fresh(self.dry)
    }

    fn emit_jump(&mut self, ko: Ko) {
        match ko {
            Ko::Label(l) => self.out.line(&format!("goto l{}", l.0)),
            Ko::Fail => self.out.line("return false"),
        }
    }

    /// `if !(cond) { <jump to ko> }`.
    fn guard(&mut self, cond: &str, ko: Ko) {
        self.out.line(&format!("if !({cond}) {{"));
        self.out.indent_in();
        self.emit_jump(ko);
        self.out.indent_out();
        self.out.line("}");
    }

    fn enter_scope(&mut self) {
        self.thunk_stack.push(false);
    }

    /// Closes the innermost scope, returning whether it was dirtied, and
    /// propagates that dirtiness to the parent scope (a nested action still
    /// has to be undone if the *enclosing* attempt backtracks too).
    fn exit_scope(&mut self) -> bool {
        let dirty = self.thunk_stack.pop().unwrap_or(false);
        if let Some(parent) = self.thunk_stack.last_mut() {
            *parent |= dirty;
        }
        dirty
    }

    fn mark_action(&mut self) {
        if let Some(top) = self.thunk_stack.last_mut() {
            *top = true;
        }
    }

    /// The snapshot variable name for a label's saved input position.
    fn pos_var(label: Label) -> String {
        format!("position{}", label.0)
    }

    /// Namespaced apart from the rule-entry `thunkPosition0` baseline (used
    /// by `Commit` lowering) so a label numbered `0` can never collide with
    /// it.
    fn thunk_var(label: Label) -> String {
        format!("thunkPositionSave{}", label.0)
    }

    /// Emits the position snapshot (and, if the dry pass decided this scope
    /// touches the thunk buffer, the thunk-position snapshot) guarding a
    /// backtrack point identified by `label`. Call once, right before
    /// attempting the guarded sub-expression.
    fn save(&mut self, label: Label) {
        if self.dry {
            self.labels.mark_save_pos(label);
        }
        if !self.dry {
            self.out.line(&format!("{} := position", Self::pos_var(label)));
            if self.labels.flags(label).save_thunk {
                self.out.line(&format!("{} := thunkPosition", Self::thunk_var(label)));
            }
        }
    }

    /// Emits the restore half of [`Self::save`] and folds this scope's
    /// dirtiness into `label`'s flags (dry pass only).
    fn restore(&mut self, label: Label) {
        let dirty = self.exit_scope();
        if self.dry && dirty {
            self.labels.mark_save_thunk(label);
        }
        if !self.dry {
            self.out.line(&format!("position = {}", Self::pos_var(label)));
            if self.labels.flags(label).save_thunk {
                self.out.line(&format!("thunkPosition = {}", Self::thunk_var(label)));
            }
        }
    }
}

/// Runs the full two-pass lowering for one rule and returns the generated
/// function body (not including the enclosing `func() bool { ... }`
/// wrapper, which [`super::generate`] supplies).
pub(super) fn lower_rule(
    tree: &Tree,
    rule: &RuleDef,
    class_index: &dyn Fn(&str) -> usize,
) -> CodegenResult<String> {
    let mut labels = LabelTable::new();

    // Dry pass: discard output, populate `labels`.
    {
        let mut ctx = Ctx {
            tree,
            rule,
            class_index,
            out: Emitter::new(true),
            labels,
            dry: true,
            thunk_stack: Vec::new(),
        };
        ctx.enter_scope();
        lower_node(&mut ctx, &rule.expr, Ko::Fail)?;
        ctx.exit_scope();
        labels = ctx.labels;
    }

    labels.start_real_pass();
    let mut ctx = Ctx {
        tree,
        rule,
        class_index,
        out: Emitter::new(false),
        labels,
        dry: false,
        thunk_stack: Vec::new(),
    };
    if rule.has_actions {
        ctx.out.line("thunkPosition0 := thunkPosition");
    }
    if !rule.variables.is_empty() {
        ctx.out.line(&format!("p.doarg(yyPush, {})", rule.variables.len()));
        ctx.out.line(&format!("defer p.doarg(yyPop, {})", rule.variables.len()));
    }
    ctx.enter_scope();
    lower_node(&mut ctx, &rule.expr, Ko::Fail)?;
    ctx.exit_scope();
    ctx.out.line("return true");
    Ok(ctx.out.into_output())
}

fn lower_node(ctx: &mut Ctx, node: &Node, ko: Ko) -> CodegenResult<()> {
    match node {
        Node::Token(t) => lower_token(ctx, t, ko),
        Node::Name(n) => lower_name(ctx, n, ko),
        Node::Action(a) => {
            ctx.mark_action();
            ctx.out.line(&format!("p.do({})", a.id.0));
            Ok(())
        }
        Node::List(l) => match l.kind {
            ListKind::Alternate => lower_alternate(ctx, &l.items, ko),
            ListKind::UnorderedAlternate => lower_unordered_alternate(ctx, &l.items, ko),
            ListKind::Sequence => {
                for item in &l.items {
                    lower_node(ctx, item, ko)?;
                }
                Ok(())
            }
            ListKind::PeekFor => lower_peek_for(ctx, &l.items[0], ko),
            ListKind::PeekNot => lower_peek_not(ctx, &l.items[0], ko),
            ListKind::Query => lower_query(ctx, &l.items[0]),
            ListKind::Star => lower_star(ctx, &l.items[0]),
            ListKind::Plus => {
                lower_node(ctx, &l.items[0], ko)?;
                lower_star(ctx, &l.items[0])
            }
        },
    }
}

fn lower_token(ctx: &mut Ctx, t: &TokenNode, ko: Ko) -> CodegenResult<()> {
    match t.kind {
        TokenKind::Dot => ctx.guard("p.matchDot()", ko),
        TokenKind::Character => ctx.guard(&format!("p.matchChar({})", go_char_lit(&t.text)), ko),
        TokenKind::String if !t.text.is_empty() => {
            ctx.guard(&format!("p.matchString({})", go_string_lit(&t.text)), ko)
        }
        TokenKind::String => ctx.guard("p.peekDot()", ko),
        TokenKind::Class => {
            let idx = (ctx.class_index)(&t.text);
            ctx.guard(&format!("p.matchClass({idx})"), ko)
        }
        TokenKind::Predicate => ctx.guard(&format!("({})", t.text), ko),
        TokenKind::Commit => ctx.guard("p.commit(thunkPosition0)", ko),
        TokenKind::Begin => {
            if ctx.rule.has_actions {
                ctx.out.line("begin = position");
            }
            Ok(())
        }
        TokenKind::End => {
            if ctx.rule.has_actions {
                ctx.out.line("end = position");
            }
            Ok(())
        }
        TokenKind::Nil => Ok(()),
    }
}

fn lower_name(ctx: &mut Ctx, n: &crate::ast::NameNode, ko: Ko) -> CodegenResult<()> {
    let Some(id) = ctx.tree.rule_id(&n.name) else {
        return Err(CodegenError::Internal(1));
    };
    let inlinable = ctx.tree.inline
        && ctx.tree.ref_counts().is_some_and(|rc| rc[id.index()] == 1)
        && ctx.tree.rule(id).is_some_and(|r| !r.is_undefined());

    if inlinable {
        let target = ctx.tree.rule(id).expect("checked above");
        lower_node(ctx, &target.expr, ko)?;
    } else {
        ctx.guard(&format!("p.rules[rule{}]()", rule_const_name(&n.name)), ko);
    }

    if let Some(var_id) = n.capture {
        let slot = ctx
            .rule
            .variables
            .get_index(var_id.0 as usize)
            .map(|(_, v)| v.slot)
            .ok_or(CodegenError::Internal(2))?;
        ctx.out.line(&format!("p.doarg(yySet, {slot})"));
    }
    Ok(())
}

/// `Alternate(e1…ek)`: each non-last branch gets its own failure label that
/// restores position/thunk-position and falls into the next branch; the
/// last branch fails straight through to the surrounding `ko`.
fn lower_alternate(ctx: &mut Ctx, items: &[Node], ko: Ko) -> CodegenResult<()> {
    let Some((last, rest)) = items.split_last() else {
        return Ok(());
    };
    if rest.is_empty() {
        return lower_node(ctx, last, ko);
    }

    // Allocate every non-last branch's fail label before the shared `ok`
    // label, so `ok`'s id doesn't need to be known before the loop starts.
    let fails: Vec<Label> = rest.iter().map(|_| ctx.fresh_label()).collect();
    let ok = ctx.fresh_label();
    for (branch, &fail) in rest.iter().zip(&fails) {
        ctx.enter_scope();
        ctx.save(fail);
        lower_node(ctx, branch, Ko::Label(fail))?;
        ctx.out.line(&format!("goto l{}", ok.0));
        ctx.out.line(&format!("l{}:", fail.0));
        ctx.out.indent_in();
        ctx.restore(fail);
        ctx.out.indent_out();
    }
    lower_node(ctx, last, ko)?;
    ctx.out.line(&format!("l{}:", ok.0));
    Ok(())
}

/// `UnorderedAlternate`: an EOF guard followed by a tagless `switch` that
/// dispatches on the byte at `position`, one case per `Sequence(PeekFor
/// (Class), branch)` child, lowering just the branch body without its
/// leading class-peek, which the switch already verified. A branch that
/// doesn't match any case falls straight through to `ko` — by construction
/// any ordered residual was already tried earlier in the containing
/// `Alternate`, so there is nothing left to retry here.
fn lower_unordered_alternate(ctx: &mut Ctx, items: &[Node], ko: Ko) -> CodegenResult<()> {
    ctx.guard("position < len(p.Buffer)", ko);
    ctx.out.line("switch {");
    ctx.out.indent_in();
    for item in items {
        let Node::List(seq) = item else {
            continue;
        };
        let Some((Node::List(peek), [inner])) = seq.items.split_first() else {
            continue;
        };
        let Node::Token(class_tok) = &peek.items[0] else {
            continue;
        };
        let idx = (ctx.class_index)(&class_tok.text);
        ctx.out.line(&format!("case classMatches({idx}, p.Buffer[position]):"));
        ctx.out.indent_in();
        lower_node(ctx, inner, ko)?;
        ctx.out.indent_out();
    }
    ctx.out.indent_out();
    ctx.out.line("}");
    Ok(())
}

/// `PeekFor(x)`: try `x`; restore and fall through on success (zero-width
/// assertion); restore and jump to `ko` on failure. `Dot`/`Character`/
/// `Predicate` specialize to a direct peek with no save/restore at all.
fn lower_peek_for(ctx: &mut Ctx, inner: &Node, ko: Ko) -> CodegenResult<()> {
    match inner {
        Node::Token(t) if t.kind == TokenKind::Dot => ctx.guard("p.peekDot()", ko),
        Node::Token(t) if t.kind == TokenKind::Character => {
            ctx.guard(&format!("p.peekChar({})", go_char_lit(&t.text)), ko)
        }
        Node::Token(t) if t.kind == TokenKind::Predicate => ctx.guard(&format!("({})", t.text), ko),
        _ => {
            let fail = ctx.fresh_label();
            let after = ctx.fresh_label();
            ctx.enter_scope();
            ctx.save(fail);
            lower_node(ctx, inner, Ko::Label(fail))?;
            ctx.restore(fail);
            ctx.out.line(&format!("goto l{}", after.0));
            ctx.out.line(&format!("l{}:", fail.0));
            ctx.out.indent_in();
            ctx.out.line(&format!("position = position{}", fail.0));
            ctx.emit_jump(ko);
            ctx.out.indent_out();
            ctx.out.line(&format!("l{}:", after.0));
            Ok(())
        }
    }
}

/// `PeekNot(x)`: if `x` succeeds, restore and jump to `ko`; if it fails,
/// restore and fall through (zero-width negative assertion).
fn lower_peek_not(ctx: &mut Ctx, inner: &Node, ko: Ko) -> CodegenResult<()> {
    match inner {
        Node::Token(t) if t.kind == TokenKind::Dot => ctx.guard("!p.peekDot()", ko),
        Node::Token(t) if t.kind == TokenKind::Character => {
            ctx.guard(&format!("!p.peekChar({})", go_char_lit(&t.text)), ko)
        }
        Node::Token(t) if t.kind == TokenKind::Predicate => {
            ctx.guard(&format!("!({})", t.text), ko)
        }
        _ => {
            let matched = ctx.fresh_label();
            let fail = ctx.fresh_label();
            ctx.enter_scope();
            ctx.save(matched);
            lower_node(ctx, inner, Ko::Label(fail))?;
            // inner succeeded: the negative assertion fails.
            ctx.restore(matched);
            ctx.emit_jump(ko);
            ctx.out.line(&format!("l{}:", fail.0));
            ctx.out.indent_in();
            ctx.out.line(&format!("position = position{}", matched.0));
            ctx.out.indent_out();
            Ok(())
        }
    }
}

/// `Query(x)`: try `x` once; on failure restore and fall through either way
/// (always succeeds, zero or more input consumed).
fn lower_query(ctx: &mut Ctx, inner: &Node) -> CodegenResult<()> {
    let fail = ctx.fresh_label();
    let after = ctx.fresh_label();
    ctx.enter_scope();
    ctx.save(fail);
    lower_node(ctx, inner, Ko::Label(fail))?;
    ctx.out.line(&format!("goto l{}", after.0));
    ctx.out.line(&format!("l{}:", fail.0));
    ctx.out.indent_in();
    ctx.restore(fail);
    ctx.out.indent_out();
    ctx.out.line(&format!("l{}:", after.0));
    Ok(())
}

/// `Star(x)`: `again: try x against out; on success goto again; out:
/// restore`. Always succeeds (zero or more repetitions).
fn lower_star(ctx: &mut Ctx, inner: &Node) -> CodegenResult<()> {
    let again = ctx.fresh_label();
    let out = ctx.fresh_label();
    ctx.out.line(&format!("l{}:", again.0));
    ctx.enter_scope();
    ctx.save(out);
    lower_node(ctx, inner, Ko::Label(out))?;
    ctx.out.line(&format!("goto l{}", again.0));
    ctx.out.line(&format!("l{}:", out.0));
    ctx.out.indent_in();
    ctx.restore(out);
    ctx.out.indent_out();
    Ok(())
}

/// Go identifier for `rule<Name>` with any character illegal in a Go
/// identifier stripped — grammar rule names are user text, so this can't
/// assume they're already valid identifiers.
pub(super) fn rule_const_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        if ch.is_alphanumeric() || ch == '_' {
            if i == 0 && ch.is_ascii_digit() {
                out.push('_');
            }
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

fn go_char_lit(text: &str) -> String {
    format!("'{}'", text.replace('\'', "\\'"))
}

fn go_string_lit(text: &str) -> String {
    format!("{text:?}")
}

/// Exposed for the type-count pass's consumers: which [`NodeKind`]s need
/// their corresponding matcher helper emitted.
pub(super) fn needs_helper(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Dot | NodeKind::Character | NodeKind::String | NodeKind::Class
    )
}

#[cfg(test)]
mod lower_tests;
