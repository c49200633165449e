//! Enumeration oracle: lazy solutions of quantified boolean conditions.

use crate::rewrite::{RewriteError, Rewriter};
use crate::sort::Sort;
use crate::subst::Substitution;
use crate::term::{Term, TermId, TermPool};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

/// Enumeration error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnumerateError {
    #[error("cannot enumerate variable '{0}' of unbounded sort")]
    UnboundedSort(String),

    #[error("term {0} is not a variable")]
    NotAVariable(String),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

pub type EnumerateResult<T> = Result<T, EnumerateError>;

/// One solution: values for the enumerated variables, in variable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation {
    values: SmallVec<[TermId; 4]>,
    exact: bool,
}

impl Valuation {
    pub fn new(values: SmallVec<[TermId; 4]>, exact: bool) -> Self {
        Self { values, exact }
    }

    pub fn values(&self) -> &[TermId] {
        &self.values
    }

    /// True if the condition rewrote to `true` under this valuation.
    /// False means the oracle could not decide the condition.
    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

/// A lazy stream of valuations.
///
/// `sigma` is the binding context current at the time of the pull. Streams
/// that residualise their condition when created may ignore it.
pub trait ValuationStream {
    fn next_valuation(
        &mut self,
        rewriter: &dyn Rewriter,
        sigma: &Substitution,
    ) -> Option<EnumerateResult<Valuation>>;
}

/// An enumeration oracle.
pub trait Enumerator: Send + Sync {
    /// Solve `condition` for `vars` (ids of variable terms) under `sigma`.
    fn solve(
        &self,
        rewriter: &dyn Rewriter,
        vars: &[TermId],
        condition: TermId,
        sigma: &Substitution,
    ) -> EnumerateResult<Box<dyn ValuationStream>>;
}

/// Enumerator over finite sorts.
///
/// The condition is rewritten under `sigma` once, when the stream is
/// created; candidates from the cartesian product of the variables' domains
/// are then checked lazily against that residual condition. Bindings in
/// `sigma` for the enumerated variables themselves are ignored, since the
/// enumerated variables are bound by the quantifier.
///
/// Integer ranges are walked by offset and interned one value at a time, so
/// a wide range costs nothing until it is pulled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainEnumerator;

impl DomainEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl Enumerator for DomainEnumerator {
    fn solve(
        &self,
        rewriter: &dyn Rewriter,
        vars: &[TermId],
        condition: TermId,
        sigma: &Substitution,
    ) -> EnumerateResult<Box<dyn ValuationStream>> {
        let pool = rewriter.pool();

        let masked;
        let context = if vars.iter().any(|v| sigma.contains(*v)) {
            let mut m = sigma.clone();
            for v in vars {
                m.remove(*v);
            }
            masked = m;
            &masked
        } else {
            sigma
        };
        let residual = rewriter.rewrite(condition, context)?;

        if pool.as_bool(residual) == Some(false) {
            return Ok(Box::new(Empty));
        }

        let mut domains = Vec::with_capacity(vars.len());
        for &var in vars {
            let v = match pool.get(var) {
                Some(Term::Var(v)) => v,
                _ => return Err(EnumerateError::NotAVariable(pool.display(var))),
            };
            let domain = match &v.sort {
                Sort::Bool => Domain::Values([false, true].iter().map(|b| pool.bool(*b)).collect()),
                Sort::Range { lo, hi } if hi < lo => return Ok(Box::new(Empty)),
                Sort::Range { lo, hi } => Domain::Range {
                    lo: *lo,
                    last: (*hi as i128 - *lo as i128) as u64,
                },
                Sort::Enum(e) if e.constructors.is_empty() => return Ok(Box::new(Empty)),
                Sort::Enum(e) => Domain::Values(
                    (0..e.constructors.len() as u32)
                        .map(|i| pool.intern(Term::Ctor(e.clone(), i)))
                        .collect(),
                ),
                Sort::Int => return Err(EnumerateError::UnboundedSort(v.name.to_string())),
            };
            domains.push(domain);
        }

        trace!(
            vars = vars.len(),
            residual = %pool.display(residual),
            "enumerating condition"
        );

        Ok(Box::new(DomainStream {
            vars: vars.iter().copied().collect(),
            residual,
            cursor: vec![0; domains.len()],
            domains,
            done: false,
            scratch: Substitution::with_capacity(vars.len()),
        }))
    }
}

/// A stream without solutions.
struct Empty;

impl ValuationStream for Empty {
    fn next_valuation(
        &mut self,
        _rewriter: &dyn Rewriter,
        _sigma: &Substitution,
    ) -> Option<EnumerateResult<Valuation>> {
        None
    }
}

/// The non-empty set of values one variable ranges over.
enum Domain {
    Values(SmallVec<[TermId; 4]>),
    /// `lo ..= lo + last`.
    Range { lo: i64, last: u64 },
}

impl Domain {
    /// Offset of the final value.
    fn last(&self) -> u64 {
        match self {
            Domain::Values(values) => values.len() as u64 - 1,
            Domain::Range { last, .. } => *last,
        }
    }

    fn value(&self, pool: &TermPool, offset: u64) -> TermId {
        match self {
            Domain::Values(values) => values[offset as usize],
            Domain::Range { lo, .. } => pool.int((*lo as i128 + offset as i128) as i64),
        }
    }
}

/// Odometer over the product of the variables' domains.
struct DomainStream {
    vars: SmallVec<[TermId; 4]>,
    residual: TermId,
    domains: Vec<Domain>,
    cursor: Vec<u64>,
    done: bool,
    scratch: Substitution,
}

impl DomainStream {
    fn advance(&mut self) {
        for i in (0..self.cursor.len()).rev() {
            if self.cursor[i] < self.domains[i].last() {
                self.cursor[i] += 1;
                return;
            }
            self.cursor[i] = 0;
        }
        self.done = true;
    }
}

impl ValuationStream for DomainStream {
    fn next_valuation(
        &mut self,
        rewriter: &dyn Rewriter,
        _sigma: &Substitution,
    ) -> Option<EnumerateResult<Valuation>> {
        let pool = rewriter.pool();
        while !self.done {
            let values: SmallVec<[TermId; 4]> = self
                .cursor
                .iter()
                .zip(&self.domains)
                .map(|(k, d)| d.value(pool, *k))
                .collect();
            self.advance();

            for (var, value) in self.vars.iter().zip(&values) {
                self.scratch.assign(*var, *value);
            }
            let verdict = rewriter.rewrite(self.residual, &self.scratch);
            self.scratch.clear();

            match verdict {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                Ok(t) => match pool.as_bool(t) {
                    Some(true) => return Some(Ok(Valuation::new(values, true))),
                    Some(false) => continue,
                    None => return Some(Ok(Valuation::new(values, false))),
                },
            }
        }
        None
    }
}
