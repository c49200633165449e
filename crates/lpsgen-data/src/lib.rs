//! Data layer for lpsgen: sorts, expressions, the hash-consed term pool,
//! and the rewriting and enumeration oracles the next-state engine talks to.

pub mod enumerate;
pub mod expr;
pub mod rewrite;
pub mod sort;
pub mod subst;
pub mod term;

pub use enumerate::{
    DomainEnumerator, EnumerateError, EnumerateResult, Enumerator, Valuation, ValuationStream,
};
pub use expr::{DataExpr, Op};
pub use rewrite::{InnermostRewriter, RewriteError, RewriteResult, Rewriter};
pub use sort::{EnumSort, Sort, Variable};
pub use subst::Substitution;
pub use term::{Term, TermId, TermPool};
