//! External (tree-shaped) data expressions.
//!
//! `DataExpr` is the form in which a specification hands data to the engine.
//! It is converted once into the interned internal form (`TermId`) by
//! [`crate::Rewriter::to_internal`]; all evaluation happens on that form.

use crate::sort::{EnumSort, Sort, Variable};
use std::fmt;
use std::sync::Arc;

/// Built-in operators of the data language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // === Boolean ===
    Not,
    And,
    Or,
    Implies,

    // === Comparison ===
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    // === Arithmetic ===
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    /// `if(c, then, else)`.
    If,
}

impl Op {
    /// Number of arguments the operator takes.
    pub fn arity(self) -> usize {
        match self {
            Op::Not | Op::Neg => 1,
            Op::If => 3,
            _ => 2,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Op::Not => "!",
            Op::And => "&&",
            Op::Or => "||",
            Op::Implies => "=>",
            Op::Eq => "==",
            Op::Neq => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Neg => "-",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::If => "if",
        }
    }
}

/// A data expression as produced by a specification loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataExpr {
    Var(Variable),
    Bool(bool),
    Int(i64),
    /// Constructor `index` of an enumerated sort.
    Ctor(Arc<EnumSort>, u32),
    App(Op, Vec<DataExpr>),
}

impl DataExpr {
    pub fn var(v: &Variable) -> Self {
        DataExpr::Var(v.clone())
    }

    pub fn ctor(sort: &Arc<EnumSort>, name: &str) -> Option<Self> {
        sort.constructor_index(name)
            .map(|i| DataExpr::Ctor(sort.clone(), i))
    }

    pub fn app(op: Op, args: Vec<DataExpr>) -> Self {
        debug_assert_eq!(op.arity(), args.len(), "arity mismatch for {:?}", op);
        DataExpr::App(op, args)
    }

    pub fn not(e: DataExpr) -> Self {
        Self::app(Op::Not, vec![e])
    }

    pub fn and(a: DataExpr, b: DataExpr) -> Self {
        Self::app(Op::And, vec![a, b])
    }

    pub fn or(a: DataExpr, b: DataExpr) -> Self {
        Self::app(Op::Or, vec![a, b])
    }

    pub fn eq(a: DataExpr, b: DataExpr) -> Self {
        Self::app(Op::Eq, vec![a, b])
    }

    pub fn lt(a: DataExpr, b: DataExpr) -> Self {
        Self::app(Op::Lt, vec![a, b])
    }

    pub fn add(a: DataExpr, b: DataExpr) -> Self {
        Self::app(Op::Add, vec![a, b])
    }

    pub fn ite(c: DataExpr, t: DataExpr, e: DataExpr) -> Self {
        Self::app(Op::If, vec![c, t, e])
    }

    /// The sort of this expression. Arithmetic yields `Int`; `if` takes the
    /// sort of its then-branch.
    pub fn sort(&self) -> Sort {
        match self {
            DataExpr::Var(v) => v.sort.clone(),
            DataExpr::Bool(_) => Sort::Bool,
            DataExpr::Int(_) => Sort::Int,
            DataExpr::Ctor(s, _) => Sort::Enum(s.clone()),
            DataExpr::App(op, args) => match op {
                Op::Neg | Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => Sort::Int,
                Op::If => args.get(1).map_or(Sort::Bool, |t| t.sort()),
                _ => Sort::Bool,
            },
        }
    }

    /// True for literals: booleans, integers and constructors.
    pub fn is_value(&self) -> bool {
        matches!(self, DataExpr::Bool(_) | DataExpr::Int(_) | DataExpr::Ctor(..))
    }

    /// The first subexpression that is not well formed: an application with
    /// the wrong number of arguments, or a constructor index past the end of
    /// its sort.
    pub fn malformed(&self) -> Option<&DataExpr> {
        match self {
            DataExpr::App(op, args) => {
                if args.len() != op.arity() {
                    return Some(self);
                }
                args.iter().find_map(|a| a.malformed())
            }
            DataExpr::Ctor(s, i) if *i as usize >= s.constructors.len() => Some(self),
            _ => None,
        }
    }

    /// Collect the variables occurring in this expression, in first-occurrence order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            DataExpr::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            DataExpr::App(_, args) => {
                for a in args {
                    a.collect_variables(out);
                }
            }
            _ => {}
        }
    }

    /// Replace variables for which `f` returns a value.
    pub fn substitute<F>(&self, f: &F) -> DataExpr
    where
        F: Fn(&Variable) -> Option<DataExpr>,
    {
        match self {
            DataExpr::Var(v) => f(v).unwrap_or_else(|| self.clone()),
            DataExpr::App(op, args) => {
                DataExpr::App(*op, args.iter().map(|a| a.substitute(f)).collect())
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for DataExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataExpr::Var(v) => write!(f, "{}", v.name),
            DataExpr::Bool(b) => write!(f, "{}", b),
            DataExpr::Int(n) => write!(f, "{}", n),
            DataExpr::Ctor(s, i) => match s.constructors.get(*i as usize) {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "{}#{}", s.name, i),
            },
            DataExpr::App(op, args) => match (op, args.as_slice()) {
                (Op::Not | Op::Neg, [a]) => write!(f, "{}({})", op.symbol(), a),
                (Op::If, [c, t, e]) => write!(f, "if({}, {}, {})", c, t, e),
                (_, [a, b]) => write!(f, "({} {} {})", a, op.symbol(), b),
                _ => {
                    write!(f, "{}(", op.symbol())?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ")")
                }
            },
        }
    }
}
