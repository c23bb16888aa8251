//! Analysis passes: independent read-only traversals over an already-built
//! [`crate::ast::Tree`], run after the builder phase completes and before
//! code generation.
//!
//! [`analyze`] runs the rule-reference pass and the left-recursion pass —
//! both read-only over the AST and safe to run concurrently — via
//! `std::thread::scope`, joining before returning. The type-count pass is a
//! third independent traversal but is consumed directly by the code
//! generator rather than stored on `Tree`, so it is run on demand by
//! [`crate::codegen::generate`] instead of here. Alternate/switch
//! optimization is optional, gated by [`crate::ast::Tree::switch`],
//! sequential (it mutates the tree), and run explicitly by the generator
//! immediately before lowering the start rule.

pub mod altopt;
pub mod leftrec;
pub mod refs;
pub mod type_count;
pub mod visitor;

pub use type_count::{count, TypeCounts};

use crate::ast::Tree;
use crate::diagnostics::Diagnostics;

/// Runs the rule-reference and left-recursion passes, installing the
/// resulting reference counts onto `tree` and returning the union of both
/// passes' diagnostics (undefined/unused rules, left recursion).
pub fn analyze(tree: &mut Tree) -> Diagnostics {
    let read_only: &Tree = tree;
    let (refs_diags, counts, leftrec_diags) = std::thread::scope(|scope| {
        let refs_handle = scope.spawn(|| refs::run(read_only));
        let leftrec_handle = scope.spawn(|| leftrec::run(read_only));
        let (refs_diags, counts) = refs_handle.join().expect("rule-reference pass panicked");
        let leftrec_diags = leftrec_handle.join().expect("left-recursion pass panicked");
        (refs_diags, counts, leftrec_diags)
    });

    tree.set_ref_counts(counts);
    let mut diags = refs_diags;
    diags.extend(leftrec_diags);
    diags
}

/// Sequential equivalent of [`analyze`], for callers that would rather not
/// pay for thread spawn/join on small grammars.
pub fn analyze_sequential(tree: &mut Tree) -> Diagnostics {
    let (mut diags, counts) = refs::run(tree);
    tree.set_ref_counts(counts);
    diags.extend(leftrec::run(tree));
    diags
}
