//! Rewriting oracle interface and the built-in innermost rewriter.

use crate::expr::{DataExpr, Op};
use crate::sort::Sort;
use crate::subst::Substitution;
use crate::term::{Term, TermId, TermPool};
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// Rewriting error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("division by zero in {0}")]
    DivisionByZero(String),

    #[error("integer overflow in {0}")]
    Overflow(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RewriteResult<T> = Result<T, RewriteError>;

/// A data rewriting oracle.
///
/// Terms are interned in the oracle's [`TermPool`]; substitutions map
/// variable ids to normal forms. Implementations must be deterministic:
/// the same term under the same substitution always rewrites to the same id.
pub trait Rewriter: Send + Sync {
    /// The pool all terms handled by this rewriter live in.
    fn pool(&self) -> &TermPool;

    /// Rewrite `term` to normal form under `sigma`.
    fn rewrite(&self, term: TermId, sigma: &Substitution) -> RewriteResult<TermId>;

    /// A fixed representative value of `sort`, or None if the sort is empty.
    fn representative(&self, sort: &Sort) -> Option<DataExpr>;

    /// Convert an external expression into internal form.
    fn to_internal(&self, expr: &DataExpr) -> TermId {
        self.pool().intern_expr(expr)
    }

    /// Convert an internal data term back into an external expression.
    fn from_internal(&self, term: TermId) -> Option<DataExpr> {
        self.pool().to_expr(term)
    }

    fn rewrite_list(
        &self,
        terms: &[TermId],
        sigma: &Substitution,
    ) -> RewriteResult<SmallVec<[TermId; 4]>> {
        terms.iter().map(|t| self.rewrite(*t, sigma)).collect()
    }
}

/// Innermost rewriter for the built-in operators.
///
/// Ground applications are evaluated; open applications are simplified as
/// far as their rewritten arguments allow and otherwise kept as normal forms.
/// `&&`, `||`, `=>` and `if` evaluate their first argument before the others.
#[derive(Debug, Clone)]
pub struct InnermostRewriter {
    pool: Arc<TermPool>,
}

impl InnermostRewriter {
    pub fn new(pool: Arc<TermPool>) -> Self {
        Self { pool }
    }

    pub fn shared_pool(&self) -> &Arc<TermPool> {
        &self.pool
    }

    fn bool(&self, b: bool) -> TermId {
        self.pool.bool(b)
    }

    fn rewrite_app(
        &self,
        term: TermId,
        op: Op,
        args: &[TermId],
        sigma: &Substitution,
    ) -> RewriteResult<TermId> {
        let pool = &*self.pool;
        match op {
            Op::If => {
                let c = self.rewrite(args[0], sigma)?;
                match pool.as_bool(c) {
                    Some(true) => self.rewrite(args[1], sigma),
                    Some(false) => self.rewrite(args[2], sigma),
                    None => {
                        let t = self.rewrite(args[1], sigma)?;
                        let e = self.rewrite(args[2], sigma)?;
                        if t == e {
                            Ok(t)
                        } else {
                            Ok(pool.app(Op::If, &[c, t, e]))
                        }
                    }
                }
            }
            Op::And => {
                let a = self.rewrite(args[0], sigma)?;
                match pool.as_bool(a) {
                    Some(false) => Ok(a),
                    Some(true) => self.rewrite(args[1], sigma),
                    None => {
                        let b = self.rewrite(args[1], sigma)?;
                        match pool.as_bool(b) {
                            Some(false) => Ok(b),
                            Some(true) => Ok(a),
                            None => Ok(pool.app(Op::And, &[a, b])),
                        }
                    }
                }
            }
            Op::Or => {
                let a = self.rewrite(args[0], sigma)?;
                match pool.as_bool(a) {
                    Some(true) => Ok(a),
                    Some(false) => self.rewrite(args[1], sigma),
                    None => {
                        let b = self.rewrite(args[1], sigma)?;
                        match pool.as_bool(b) {
                            Some(true) => Ok(b),
                            Some(false) => Ok(a),
                            None => Ok(pool.app(Op::Or, &[a, b])),
                        }
                    }
                }
            }
            Op::Implies => {
                let a = self.rewrite(args[0], sigma)?;
                match pool.as_bool(a) {
                    Some(false) => Ok(self.bool(true)),
                    Some(true) => self.rewrite(args[1], sigma),
                    None => {
                        let b = self.rewrite(args[1], sigma)?;
                        match pool.as_bool(b) {
                            Some(true) => Ok(b),
                            _ => Ok(pool.app(Op::Implies, &[a, b])),
                        }
                    }
                }
            }
            _ => {
                let rewritten = self.rewrite_list(args, sigma)?;
                self.apply(term, op, &rewritten)
            }
        }
    }

    /// Evaluate a strict operator on already rewritten arguments.
    fn apply(&self, term: TermId, op: Op, args: &[TermId]) -> RewriteResult<TermId> {
        let pool = &*self.pool;
        let ints = || -> Option<(i64, i64)> { Some((pool.as_int(args[0])?, pool.as_int(args[1])?)) };
        let result = match op {
            Op::Not => pool.as_bool(args[0]).map(|b| self.bool(!b)),
            Op::Eq | Op::Neq => {
                let equal = if args[0] == args[1] {
                    Some(true)
                } else if pool.is_value(args[0]) && pool.is_value(args[1]) {
                    Some(false)
                } else {
                    None
                };
                equal.map(|e| self.bool(if op == Op::Eq { e } else { !e }))
            }
            Op::Lt => ints().map(|(a, b)| self.bool(a < b)),
            Op::Le => ints().map(|(a, b)| self.bool(a <= b)),
            Op::Gt => ints().map(|(a, b)| self.bool(a > b)),
            Op::Ge => ints().map(|(a, b)| self.bool(a >= b)),
            Op::Neg => match pool.as_int(args[0]) {
                Some(n) => Some(pool.int(n.checked_neg().ok_or_else(|| self.overflow(term))?)),
                None => None,
            },
            Op::Add | Op::Sub | Op::Mul => match ints() {
                Some((a, b)) => {
                    let r = match op {
                        Op::Add => a.checked_add(b),
                        Op::Sub => a.checked_sub(b),
                        _ => a.checked_mul(b),
                    };
                    Some(pool.int(r.ok_or_else(|| self.overflow(term))?))
                }
                None => None,
            },
            Op::Div | Op::Mod => match ints() {
                Some((_, 0)) => {
                    return Err(RewriteError::DivisionByZero(pool.display(term)));
                }
                Some((a, b)) => {
                    let r = if op == Op::Div {
                        a.checked_div_euclid(b)
                    } else {
                        a.checked_rem_euclid(b)
                    };
                    Some(pool.int(r.ok_or_else(|| self.overflow(term))?))
                }
                None => None,
            },
            Op::And | Op::Or | Op::Implies | Op::If => {
                return Err(RewriteError::Internal(format!(
                    "{:?} is not a strict operator",
                    op
                )))
            }
        };
        Ok(result.unwrap_or_else(|| pool.app(op, args)))
    }

    fn overflow(&self, term: TermId) -> RewriteError {
        RewriteError::Overflow(self.pool.display(term))
    }
}

impl Rewriter for InnermostRewriter {
    fn pool(&self) -> &TermPool {
        &self.pool
    }

    fn rewrite(&self, term: TermId, sigma: &Substitution) -> RewriteResult<TermId> {
        match self.pool.get(term) {
            None => Err(RewriteError::Internal(format!("unknown term {:?}", term))),
            Some(Term::Var(_)) => Ok(sigma.get(term).unwrap_or(term)),
            Some(Term::App(op, args)) if args.len() != op.arity() => {
                Err(RewriteError::Internal(format!(
                    "{:?} applied to {} arguments, expected {}",
                    op,
                    args.len(),
                    op.arity()
                )))
            }
            Some(Term::App(op, args)) => self.rewrite_app(term, op, &args, sigma),
            Some(_) => Ok(term),
        }
    }

    fn representative(&self, sort: &Sort) -> Option<DataExpr> {
        match sort {
            Sort::Bool => Some(DataExpr::Bool(false)),
            Sort::Int => Some(DataExpr::Int(0)),
            Sort::Range { lo, hi } => (lo <= hi).then_some(DataExpr::Int(*lo)),
            Sort::Enum(e) => (!e.constructors.is_empty()).then(|| DataExpr::Ctor(e.clone(), 0)),
        }
    }
}
