//! Grammar-level diagnostics.
//!
//! [`crate::ast::Tree`] has no source text of its own — locating a problem
//! in a source file is the front-end's responsibility. A [`Diagnostic`]
//! instead carries the rule name it concerns, which is all the analysis
//! passes have to report against.

use std::fmt;

/// Severity of a single diagnostic. Only `Error`-severity diagnostics affect
/// a caller's decision to treat compilation as failed; `Warning` never stops
/// code generation — grammar problems are reported, not fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// The specific condition a [`Diagnostic`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A rule calls itself (directly or transitively) without consuming
    /// input first. Reported by the left-recursion pass.
    InfiniteLeftRecursion,
    /// A `Name` refers to a rule that was never declared with `AddRule`.
    UndefinedRule,
    /// A rule is declared but never reachable from the start rule.
    UnusedRule,
    /// The generator detected a state it cannot explain for a well-formed
    /// tree (mirrors [`crate::error::CodegenError::Internal`]).
    Internal(u32),
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::InfiniteLeftRecursion => {
                write!(f, "possible infinite left recursion")
            }
            DiagnosticKind::UndefinedRule => write!(f, "rule is used but not defined"),
            DiagnosticKind::UnusedRule => write!(f, "rule is defined but not used"),
            DiagnosticKind::Internal(n) => write!(f, "internal error #{n}"),
        }
    }
}

/// A single diagnostic message, naming the rule it concerns (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub rule: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "{}: {} (rule '{}')", self.severity, self.kind, rule),
            None => write!(f, "{}: {}", self.severity, self.kind),
        }
    }
}

/// An ordered collection of diagnostics accumulated across the analysis
/// passes and the code generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_warning(&mut self, kind: DiagnosticKind, rule: impl Into<Option<String>>) {
        self.messages.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            rule: rule.into(),
        });
    }

    pub fn push_error(&mut self, kind: DiagnosticKind, rule: impl Into<Option<String>>) {
        self.messages.push(Diagnostic {
            severity: Severity::Error,
            kind,
            rule: rule.into(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warning)
            .count()
    }

    /// Renders every message, one per line, to `w`.
    pub fn print(&self, w: &mut impl std::fmt::Write) -> std::fmt::Result {
        for message in &self.messages {
            writeln!(w, "{message}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

#[cfg(test)]
mod diagnostics_tests;
