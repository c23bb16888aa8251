//! Top-level code generator.
//!
//! [`generate`] runs the optional alternate/switch optimization pass, then
//! stitches the shared parser scaffolding around the per-rule bodies
//! [`lower::lower_rule`] produces: headers, an optional package clause, a
//! dense `rule<Name>` id const block, the `thunk`/action-id support types,
//! the parser struct, `Parse`, `PrintError`, `ResetBuffer`, and `Init` (which
//! defines the matcher/thunk closures and assigns `p.rules`), followed by
//! the trailers.
//!
//! **Closures, not methods.** The emitted parser keeps its mutable
//! recognition state (`position`, `thunkPosition`, `begin`/`end`, the thunk
//! buffer, the `yyval` window) as plain local variables declared once
//! inside `Init`, not struct fields — every matcher helper and every
//! per-rule body is a closure built inside `Init` and assigned onto a
//! function-valued struct field (`p.matchDot = func() bool {...}`), so they
//! all close over the same locals. [`lower::lower_rule`] emits bare
//! `position`/`thunkPosition` identifiers (resolved by Go's closure
//! capture) alongside `p.`-prefixed calls into those struct fields
//! (resolved by the `*Peg` receiver `Init` itself closes over) — this
//! module is the half of the contract that makes both resolve to the same
//! names. `ResetBuffer` needs those same locals from outside `Init`, so it
//! is a closure too (`p.resetBuffer`), with the exported method a one-line
//! forward to it.

mod emitter;
mod label;
mod lower;

use std::fmt::Write as _;

use crate::analyze::{altopt, count, NodeKind, TypeCounts};
use crate::ast::Tree;
use crate::error::{CodegenError, CodegenResult};

pub use emitter::Emitter;

/// Runs the alternate/switch optimization pass (a no-op unless
/// `tree.switch` is set) and emits the complete recognizer as Go-shaped
/// source text.
pub fn generate(tree: &mut Tree) -> CodegenResult<String> {
    altopt::optimize(tree);
    let counts = count(tree);
    let tree: &Tree = tree;

    let class_keys: Vec<String> = tree.classes().map(|(k, _)| k.to_string()).collect();
    let class_index = |literal: &str| -> usize {
        class_keys.iter().position(|k| k == literal).unwrap_or(0)
    };

    let mut gen = Generator::new(tree, &counts);
    gen.emit_headers();
    gen.emit_package();
    gen.emit_rule_consts();
    gen.emit_support_types();
    gen.emit_struct();
    gen.emit_parse();
    gen.emit_print_error();
    gen.emit_reset_buffer();
    gen.emit_init(&class_index)?;
    gen.emit_trailers();
    Ok(gen.out)
}

/// Smallest of `{8,16,32,64}` whose range covers `n` distinct ids. `n` is the
/// full id space, not just `actions.len()`: when captures exist, three more
/// reserved ids (`yyPush`/`yyPop`/`yySet`) share the same field.
fn action_field_width(n: usize) -> &'static str {
    if n <= 1 << 8 {
        "uint8"
    } else if n <= 1 << 16 {
        "uint16"
    } else if n <= 1usize.checked_shl(32).unwrap_or(usize::MAX) {
        "uint32"
    } else {
        "uint64"
    }
}

struct Generator<'a> {
    tree: &'a Tree,
    counts: &'a TypeCounts,
    out: String,
    peg_name: String,
    yystype: String,
    has_actions: bool,
    has_variables: bool,
    /// Whether the thunk/action machinery is emitted at all — needed
    /// whenever there's an action, a capture to push/pop/set, or a
    /// `commit` construct that would otherwise reference it.
    has_thunks: bool,
    action_width: &'static str,
}

impl<'a> Generator<'a> {
    fn new(tree: &'a Tree, counts: &'a TypeCounts) -> Self {
        let has_actions = tree.rules().iter().any(|r| r.has_actions);
        let has_variables = tree.rules().iter().any(|r| !r.variables.is_empty());
        let has_thunks = has_actions || has_variables || counts.any(NodeKind::Commit);
        let total_ids = tree.actions().len() + if has_variables { 3 } else { 0 };
        Generator {
            tree,
            counts,
            out: String::new(),
            peg_name: tree.directives.peg_type.clone().unwrap_or_else(|| "Peg".to_string()),
            yystype: tree.directives.yystype.clone().unwrap_or_else(|| "interface{}".to_string()),
            has_actions,
            has_variables,
            has_thunks,
            action_width: action_field_width(total_ids.max(1)),
        }
    }

    fn line(&mut self, s: &str) {
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn emit_headers(&mut self) {
        for header in &self.tree.headers {
            self.out.push_str(header);
            if !header.ends_with('\n') {
                self.out.push('\n');
            }
        }
        if !self.tree.headers.is_empty() {
            self.blank();
        }
    }

    fn emit_package(&mut self) {
        if let Some(package) = &self.tree.directives.package {
            let _ = writeln!(self.out, "package {package}");
            self.blank();
        }
        // PrintError always uses fmt.Fprintf/os.Stderr.
        let needs_strings = self.counts.any(NodeKind::String)
            && self.tree.rules().iter().any(|r| contains_nonempty_string(&r.expr));
        self.line("import (");
        self.line("\t\"fmt\"");
        self.line("\t\"os\"");
        if needs_strings {
            self.line("\t\"strings\"");
        }
        self.line(")");
        self.blank();
    }

    /// `const ( ruleFoo = iota; ruleBar; ... )` — dense ids in declaration
    /// order, referenced by [`lower::rule_const_name`].
    fn emit_rule_consts(&mut self) {
        self.line("const (");
        for (i, rule) in self.tree.rules().iter().enumerate() {
            let name = lower::rule_const_name(&rule.name);
            if i == 0 {
                let _ = writeln!(self.out, "\trule{name} = iota");
            } else {
                let _ = writeln!(self.out, "\trule{name}");
            }
        }
        self.line(")");
        self.blank();
    }

    /// The `thunk` record and its `actionID` field type, plus the reserved
    /// meta-action ids `yyPush`/`yyPop`/`yySet` used by variable-slot
    /// bookkeeping.
    fn emit_support_types(&mut self) {
        if !self.has_thunks {
            return;
        }
        let _ = writeln!(self.out, "type actionID {}", self.action_width);
        self.blank();
        self.line("type thunk struct {");
        self.line("\taction actionID");
        self.line("\tbegin, end int");
        self.line("}");
        self.blank();

        if self.has_variables {
            let n = self.tree.actions().len();
            self.line("const (");
            let _ = writeln!(self.out, "\tyyPush actionID = actionID({n}) + iota");
            self.line("\tyyPop");
            self.line("\tyySet");
            self.line(")");
            self.blank();
        }

        if self.counts.any(NodeKind::Class) {
            self.line("var classes = [][32]byte{");
            for (literal, class) in self.tree.classes() {
                let bytes = class.as_bytes();
                let mut rendered = String::from("\t{");
                for b in bytes {
                    let _ = write!(rendered, "0x{b:02x}, ");
                }
                rendered.push_str(&format!("}}, // {literal}"));
                self.line(&rendered);
            }
            self.line("}");
            self.blank();
        }
    }

    fn emit_struct(&mut self) {
        let _ = writeln!(self.out, "type {} struct {{", self.peg_name);
        if let Some(userstate) = &self.tree.directives.userstate {
            let _ = writeln!(self.out, "\tState {userstate}");
        }
        self.line("\tBuffer string");
        self.line("\tMin, Max int");
        self.out.push('\n');
        self.line("\trules []func() bool");
        self.line("\tmatchDot func() bool");
        self.line("\tmatchChar func(byte) bool");
        self.line("\tmatchString func(string) bool");
        self.line("\tmatchClass func(int) bool");
        self.line("\tpeekDot func() bool");
        self.line("\tpeekChar func(byte) bool");
        if self.has_thunks {
            let _ = writeln!(self.out, "\tdo func(actionID)");
            let _ = writeln!(self.out, "\tdoarg func(actionID, int)");
            self.line("\tcommit func(int) bool");
        }
        if self.has_actions {
            self.line("\tresetBuffer func(string) string");
        }
        self.line("}");
        self.blank();
    }

    fn emit_parse(&mut self) {
        let _ = writeln!(self.out, "func (p *{}) Parse(rule int) bool {{", self.peg_name);
        self.line("\treturn p.rules[rule]()");
        self.line("}");
        self.blank();
    }

    fn emit_print_error(&mut self) {
        let _ = writeln!(self.out, "func (p *{}) PrintError() {{", self.peg_name);
        self.line("\tline, col := 1, 1");
        self.line("\tfor i := 0; i < p.Min && i < len(p.Buffer); i++ {");
        self.line("\t\tif p.Buffer[i] == '\\n' {");
        self.line("\t\t\tline++");
        self.line("\t\t\tcol = 1");
        self.line("\t\t} else {");
        self.line("\t\t\tcol++");
        self.line("\t\t}");
        self.line("\t}");
        self.line("\tfmt.Fprintf(os.Stderr, \"parse error near line %d, column %d (byte %d)\\n\", line, col, p.Min)");
        self.line("}");
        self.blank();
    }

    fn emit_reset_buffer(&mut self) {
        if !self.has_actions {
            return;
        }
        let _ = writeln!(self.out, "func (p *{}) ResetBuffer(s string) string {{", self.peg_name);
        self.line("\treturn p.resetBuffer(s)");
        self.line("}");
        self.blank();
    }

    fn emit_init(&mut self, class_index: &dyn Fn(&str) -> usize) -> CodegenResult<()> {
        let _ = writeln!(self.out, "func (p *{}) Init() {{", self.peg_name);
        self.line("\tvar position int");
        if self.has_thunks {
            self.line("\tvar thunkPosition, yyp int");
            self.line("\tvar begin, end int");
            self.line("\tvar thunks []thunk");
            if self.has_variables {
                let _ = writeln!(self.out, "\tvar yyval []{}", self.yystype);
            }
            let _ = writeln!(self.out, "\tvar yy {}", self.yystype);
        }
        self.blank();

        if self.counts.any(NodeKind::Dot) {
            self.line("\tp.matchDot = func() bool {");
            self.line("\t\tif position < len(p.Buffer) {");
            self.line("\t\t\tposition++");
            self.line("\t\t\tif position > p.Max {");
            self.line("\t\t\t\tp.Max = position");
            self.line("\t\t\t}");
            self.line("\t\t\treturn true");
            self.line("\t\t}");
            self.line("\t\treturn false");
            self.line("\t}");
            self.line("\tp.peekDot = func() bool {");
            self.line("\t\treturn position < len(p.Buffer)");
            self.line("\t}");
        }
        if self.counts.any(NodeKind::Character) {
            self.line("\tp.matchChar = func(c byte) bool {");
            self.line("\t\tif position < len(p.Buffer) && p.Buffer[position] == c {");
            self.line("\t\t\tposition++");
            self.line("\t\t\tif position > p.Max {");
            self.line("\t\t\t\tp.Max = position");
            self.line("\t\t\t}");
            self.line("\t\t\treturn true");
            self.line("\t\t}");
            self.line("\t\treturn false");
            self.line("\t}");
            self.line("\tp.peekChar = func(c byte) bool {");
            self.line("\t\treturn position < len(p.Buffer) && p.Buffer[position] == c");
            self.line("\t}");
        }
        if self.counts.any(NodeKind::String)
            && self.tree.rules().iter().any(|r| contains_nonempty_string(&r.expr))
        {
            self.line("\tp.matchString = func(s string) bool {");
            self.line("\t\tif strings.HasPrefix(p.Buffer[position:], s) {");
            self.line("\t\t\tposition += len(s)");
            self.line("\t\t\tif position > p.Max {");
            self.line("\t\t\t\tp.Max = position");
            self.line("\t\t\t}");
            self.line("\t\t\treturn true");
            self.line("\t\t}");
            self.line("\t\treturn false");
            self.line("\t}");
        }
        if self.counts.any(NodeKind::Class) {
            self.line("\tclassMatches := func(classIndex int, b byte) bool {");
            self.line("\t\treturn classes[classIndex][b>>3]&(1<<(b&7)) != 0");
            self.line("\t}");
            self.line("\tp.matchClass = func(classIndex int) bool {");
            self.line("\t\tif position < len(p.Buffer) && classMatches(classIndex, p.Buffer[position]) {");
            self.line("\t\t\tposition++");
            self.line("\t\t\tif position > p.Max {");
            self.line("\t\t\t\tp.Max = position");
            self.line("\t\t\t}");
            self.line("\t\t\treturn true");
            self.line("\t\t}");
            self.line("\t\treturn false");
            self.line("\t}");
        }
        self.blank();

        if self.has_thunks {
            self.line("\tp.do = func(action actionID) {");
            self.line("\t\tthunks = append(thunks[:thunkPosition], thunk{action: action, begin: begin, end: end})");
            self.line("\t\tthunkPosition++");
            self.line("\t}");
            self.line("\tp.doarg = func(action actionID, arg int) {");
            self.line("\t\tthunks = append(thunks[:thunkPosition], thunk{action: action, begin: arg})");
            self.line("\t\tthunkPosition++");
            self.line("\t}");
            self.emit_execute()?;
            self.line("\tp.commit = func(thunkPosition0 int) bool {");
            self.line("\t\tfor thunkPosition0 < thunkPosition {");
            self.line("\t\t\texecute(thunks[thunkPosition0])");
            self.line("\t\t\tthunkPosition0++");
            self.line("\t\t}");
            self.line("\t\tif position > p.Min {");
            self.line("\t\t\tp.Min = position");
            self.line("\t\t}");
            self.line("\t\treturn true");
            self.line("\t}");
        }
        if self.has_actions {
            self.line("\tp.resetBuffer = func(s string) string {");
            self.line("\t\told := p.Buffer[position:]");
            self.line("\t\tp.Buffer = s");
            self.line("\t\tposition = 0");
            self.line("\t\tthunkPosition = 0");
            self.line("\t\tthunks = thunks[:0]");
            self.line("\t\tp.Min = 0");
            self.line("\t\tp.Max = 0");
            self.line("\t\treturn old");
            self.line("\t}");
        }
        self.blank();

        let n = self.tree.rules().len();
        let _ = writeln!(self.out, "\tp.rules = make([]func() bool, {n})");
        for rule in self.tree.rules() {
            let const_name = format!("rule{}", lower::rule_const_name(&rule.name));
            if rule.is_undefined() {
                let _ = writeln!(self.out, "\tp.rules[{const_name}] = nil // used but not defined");
                continue;
            }
            let body = lower::lower_rule(self.tree, rule, class_index)
                .map_err(|_| CodegenError::Internal(1))?;
            let _ = writeln!(self.out, "\tp.rules[{const_name}] = func() bool {{");
            for line in body.lines() {
                let _ = writeln!(self.out, "\t\t{line}");
            }
            self.line("\t}");
        }
        self.line("}");
        self.blank();
        Ok(())
    }

    /// The per-thunk dispatcher: meta ops (`yyPush`/`yyPop`/`yySet`) act on
    /// the `yyval` window directly; everything else is a user action,
    /// wrapped in the variable prelude/postlude its owning rule needs.
    fn emit_execute(&mut self) -> CodegenResult<()> {
        self.line("\texecute := func(t thunk) {");
        self.line("\t\tswitch t.action {");
        if self.has_variables {
            self.line("\t\tcase yyPush:");
            self.line("\t\t\tfor i := 0; i < t.begin; i++ {");
            let _ = writeln!(self.out, "\t\t\t\tyyval = append(yyval, {}{{}})", self.yystype);
            self.line("\t\t\t}");
            self.line("\t\t\tyyp += t.begin");
            self.line("\t\tcase yyPop:");
            self.line("\t\t\tyyp -= t.begin");
            self.line("\t\t\tyyval = yyval[:yyp]");
            self.line("\t\tcase yySet:");
            self.line("\t\t\tyyval[yyp+t.begin] = yy");
            self.line("\t\tdefault:");
        } else {
            self.line("\t\tdefault:");
        }
        self.line("\t\t\tbuffer := p.Buffer[t.begin:t.end]");
        self.line("\t\t\t_ = buffer");
        self.line("\t\t\tswitch t.action {");
        for action in self.tree.actions() {
            let rule = self.tree.rule(action.rule).ok_or(CodegenError::Internal(2))?;
            let _ = writeln!(self.out, "\t\t\tcase {}:", action.id.0);
            for var in rule.variables.values() {
                let _ = writeln!(self.out, "\t\t\t\t{} := yyval[yyp+({})]", var.name, var.slot);
            }
            for line in action.text.lines() {
                let _ = writeln!(self.out, "\t\t\t\t{line}");
            }
            for var in rule.variables.values() {
                let _ = writeln!(self.out, "\t\t\t\tyyval[yyp+({})] = {}", var.slot, var.name);
            }
        }
        self.line("\t\t\t}");
        self.line("\t\t}");
        self.line("\t}");
        Ok(())
    }

    fn emit_trailers(&mut self) {
        if !self.tree.trailers.is_empty() {
            self.blank();
        }
        for trailer in &self.tree.trailers {
            self.out.push_str(trailer);
            if !trailer.ends_with('\n') {
                self.out.push('\n');
            }
        }
    }
}

/// True if `node`'s subtree contains a nonempty `String` token — used to
/// gate `matchString`/the `strings` import, since an all-empty-string
/// grammar only ever needs `peekDot` (an empty `String` literal lowers to a
/// bare `if !peekDot() goto ko`).
fn contains_nonempty_string(node: &crate::ast::Node) -> bool {
    use crate::ast::{Node, TokenKind};
    match node {
        Node::Token(t) => t.kind == TokenKind::String && !t.text.is_empty(),
        Node::List(l) => l.items.iter().any(contains_nonempty_string),
        Node::Name(_) | Node::Action(_) => false,
    }
}
