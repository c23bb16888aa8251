//! Crate-level error types.
//!
//! Grammar-level problems (undefined rules, left recursion, unused rules) are
//! never represented here — they are reported through [`crate::diagnostics`]
//! and never prevent emission. The types in this module are reserved for
//! violations of the builder's own stack discipline and for failures
//! detected while generating code, which are the front-end's and the host
//! environment's responsibility respectively.

use thiserror::Error;

/// Errors raised by [`crate::builder::Builder`] when the front-end violates
/// the stack-discipline contract it owns.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuilderError {
    /// An operation needed an expression on the stack but the stack was empty.
    #[error("operand stack is empty")]
    EmptyStack,

    /// An operation that requires an in-progress rule (e.g. `AddVariable`,
    /// `AddAction`) was called with no rule currently open.
    #[error("no rule is currently open")]
    NoCurrentRule,

    /// `AddExpression` was called, or `finish` was reached, while a rule
    /// was still open (started with `AddRule` but never closed).
    #[error("rule '{0}' was never closed with AddExpression")]
    UnterminatedRule(String),

    /// Two calls to `AddRule` used the same name. We diagnose this rather
    /// than silently overwriting the earlier entry (see DESIGN.md's Open
    /// Question decisions).
    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    /// `finish` was reached with leftover operands on the stack — a rule
    /// body pushed more nodes than it consumed.
    #[error("operand stack is not empty at end of build ({0} item(s) left)")]
    UnbalancedStack(usize),
}

/// Errors raised while generating code from an already-analyzed [`crate::ast::Tree`].
///
/// Grammar-level problems never produce one of these — only an internal
/// inconsistency in the generator itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodegenError {
    /// The generator reached a state it believes cannot happen for a
    /// well-formed [`crate::ast::Tree`] (e.g. a `Name` referencing a rule id
    /// outside the dense `[0, N)` range). Carries the same numbering the
    /// emitted parser's own `PrintError`-adjacent diagnostics use.
    #[error("internal error #{0}")]
    Internal(u32),
}

pub type BuilderResult<T> = std::result::Result<T, BuilderError>;
pub type CodegenResult<T> = std::result::Result<T, CodegenError>;
