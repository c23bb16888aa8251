//! A compiler for a Parsing Expression Grammar (PEG) dialect.
//!
//! This crate covers the grammar-to-recognizer pipeline only: it reads an
//! already-built grammar AST, handed to it through [`builder::Builder`] (the
//! text-to-AST front-end that would normally drive the builder is an
//! external collaborator and out of scope here), runs the analysis passes in
//! [`analyze`], and emits a self-contained recursive-descent recognizer as
//! text through [`codegen`].
//!
//! Data flow is linear: a front-end drives [`builder::Builder`] to produce
//! an [`ast::Tree`], [`analyze::analyze`] runs the independent analysis
//! passes over it, and [`codegen::generate`] emits the recognizer text.

pub mod analyze;
pub mod ast;
pub mod builder;
pub mod codegen;
pub mod diagnostics;
pub mod error;

pub use ast::{CharacterClass, Node, RuleId, Tree};
pub use builder::Builder;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{BuilderError, CodegenError};
