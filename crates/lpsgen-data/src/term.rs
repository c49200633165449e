//! Hash-consed term pool.
//!
//! Every term (data values, open expressions and packed states) is interned
//! into a single pool and addressed by a 32-bit [`TermId`]. Structurally
//! equal terms always receive the same id, so equality is an integer
//! comparison and equal subterms share storage.
//!
//! The pool keeps a forward table (term -> id) for interning and a reverse
//! table (id -> term) for inspection. Both are safe to use from several
//! threads, so a pool can back several engine instances at once.
//!
//! ```text
//!   forward: DashMap<Term, TermId>      reverse: Vec<Term>
//!   App(Add, [#3, #4]) -> #7            #7 -> App(Add, [#3, #4])
//! ```

use crate::expr::{DataExpr, Op};
use crate::sort::{EnumSort, Variable};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

/// Handle of an interned term.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single interned node. Children are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Bool(bool),
    Int(i64),
    Ctor(Arc<EnumSort>, u32),
    Var(Variable),
    App(Op, Arc<[TermId]>),
    /// Interior node of a tree-packed state.
    Pair(TermId, TermId),
    /// Flat-packed state.
    Vector(Arc<[TermId]>),
    /// Empty state and "no value" sentinel.
    Nil,
}

impl Term {
    /// True for literals: booleans, integers and constructors.
    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self, Term::Bool(_) | Term::Int(_) | Term::Ctor(..))
    }
}

/// Interning table for terms.
pub struct TermPool {
    forward: DashMap<Term, TermId>,
    reverse: RwLock<Vec<Term>>,
    next_id: AtomicU32,
}

impl TermPool {
    pub fn new() -> Self {
        Self {
            forward: DashMap::new(),
            reverse: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a term, returning its id.
    pub fn intern(&self, term: Term) -> TermId {
        if let Some(id) = self.forward.get(&term) {
            return *id;
        }
        let mut reverse = self.reverse.write().unwrap();
        // Double-check after lock
        if let Some(id) = self.forward.get(&term) {
            return *id;
        }
        let id = TermId(self.next_id.fetch_add(1, Ordering::Relaxed));
        reverse.push(term.clone());
        self.forward.insert(term, id);
        id
    }

    /// Look up the node for an id. Clones are cheap: children are shared.
    /// None if the id was not issued by this pool.
    pub fn get(&self, id: TermId) -> Option<Term> {
        let reverse = self.reverse.read().unwrap();
        reverse.get(id.index()).cloned()
    }

    /// Children of a `Pair` node.
    #[inline]
    pub fn pair_children(&self, id: TermId) -> Option<(TermId, TermId)> {
        let reverse = self.reverse.read().unwrap();
        match reverse.get(id.index()) {
            Some(Term::Pair(l, r)) => Some((*l, *r)),
            _ => None,
        }
    }

    /// Argument `i` of a `Vector` node.
    #[inline]
    pub fn vector_arg(&self, id: TermId, i: usize) -> Option<TermId> {
        let reverse = self.reverse.read().unwrap();
        match reverse.get(id.index()) {
            Some(Term::Vector(args)) => args.get(i).copied(),
            _ => None,
        }
    }

    /// Boolean value of a term, if it is a boolean literal.
    #[inline]
    pub fn as_bool(&self, id: TermId) -> Option<bool> {
        let reverse = self.reverse.read().unwrap();
        match reverse.get(id.index()) {
            Some(Term::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of a term, if it is an integer literal.
    #[inline]
    pub fn as_int(&self, id: TermId) -> Option<i64> {
        let reverse = self.reverse.read().unwrap();
        match reverse.get(id.index()) {
            Some(Term::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// True if the id denotes a literal value.
    #[inline]
    pub fn is_value(&self, id: TermId) -> bool {
        let reverse = self.reverse.read().unwrap();
        reverse.get(id.index()).is_some_and(Term::is_value)
    }

    /// Number of distinct terms interned so far.
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // === Constructors ===

    pub fn bool(&self, b: bool) -> TermId {
        self.intern(Term::Bool(b))
    }

    pub fn int(&self, n: i64) -> TermId {
        self.intern(Term::Int(n))
    }

    pub fn var(&self, v: &Variable) -> TermId {
        self.intern(Term::Var(v.clone()))
    }

    pub fn app(&self, op: Op, args: &[TermId]) -> TermId {
        self.intern(Term::App(op, Arc::from(args)))
    }

    pub fn pair(&self, left: TermId, right: TermId) -> TermId {
        self.intern(Term::Pair(left, right))
    }

    pub fn vector(&self, args: &[TermId]) -> TermId {
        self.intern(Term::Vector(Arc::from(args)))
    }

    pub fn nil(&self) -> TermId {
        self.intern(Term::Nil)
    }

    // === Conversion to and from the external form ===

    /// Intern an external expression.
    pub fn intern_expr(&self, expr: &DataExpr) -> TermId {
        match expr {
            DataExpr::Var(v) => self.var(v),
            DataExpr::Bool(b) => self.bool(*b),
            DataExpr::Int(n) => self.int(*n),
            DataExpr::Ctor(s, i) => self.intern(Term::Ctor(s.clone(), *i)),
            DataExpr::App(op, args) => {
                let ids: Vec<TermId> = args.iter().map(|a| self.intern_expr(a)).collect();
                self.app(*op, &ids)
            }
        }
    }

    /// Rebuild the external expression for a data term.
    /// State nodes (`Pair`, `Vector`, `Nil`) have no external form and yield None.
    pub fn to_expr(&self, id: TermId) -> Option<DataExpr> {
        Some(match self.get(id)? {
            Term::Bool(b) => DataExpr::Bool(b),
            Term::Int(n) => DataExpr::Int(n),
            Term::Ctor(s, i) => DataExpr::Ctor(s, i),
            Term::Var(v) => DataExpr::Var(v),
            Term::App(op, args) => DataExpr::App(
                op,
                args.iter()
                    .map(|a| self.to_expr(*a))
                    .collect::<Option<Vec<_>>>()?,
            ),
            Term::Pair(..) | Term::Vector(_) | Term::Nil => return None,
        })
    }

    /// Render a term for diagnostics.
    pub fn display(&self, id: TermId) -> String {
        match self.to_expr(id) {
            Some(e) => e.to_string(),
            None => match self.get(id) {
                Some(Term::Pair(l, r)) => format!("<{}, {}>", self.display(l), self.display(r)),
                Some(Term::Vector(args)) => {
                    let parts: Vec<String> = args.iter().map(|a| self.display(*a)).collect();
                    format!("[{}]", parts.join(", "))
                }
                Some(_) => "nil".to_string(),
                None => format!("<unknown {:?}>", id),
            },
        }
    }
}

impl Default for TermPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TermPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermPool").field("terms", &self.len()).finish()
    }
}
