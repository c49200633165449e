//! Sorts and typed variables.

use std::fmt;
use std::sync::Arc;

/// A user-declared enumerated sort: a name and its nullary constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumSort {
    pub name: Arc<str>,
    pub constructors: Vec<Arc<str>>,
}

impl EnumSort {
    pub fn new(name: &str, constructors: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: Arc::from(name),
            constructors: constructors.iter().map(|c| Arc::from(*c)).collect(),
        })
    }

    /// Index of the constructor called `name`, if any.
    pub fn constructor_index(&self, name: &str) -> Option<u32> {
        self.constructors
            .iter()
            .position(|c| &**c == name)
            .map(|i| i as u32)
    }
}

/// The sort of a data expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    /// Unbounded integers. Cannot be enumerated.
    Int,
    /// Integers in `lo..=hi`.
    Range { lo: i64, hi: i64 },
    Enum(Arc<EnumSort>),
}

impl Sort {
    /// Number of inhabitants, saturating at `u64::MAX`, or None for an
    /// unbounded sort.
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            Sort::Bool => Some(2),
            Sort::Int => None,
            Sort::Range { lo, hi } => {
                if hi < lo {
                    Some(0)
                } else {
                    Some(u64::try_from(*hi as i128 - *lo as i128 + 1).unwrap_or(u64::MAX))
                }
            }
            Sort::Enum(e) => Some(e.constructors.len() as u64),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.cardinality().is_some()
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Range { lo, hi } => write!(f, "{}..{}", lo, hi),
            Sort::Enum(e) => write!(f, "{}", e.name),
        }
    }
}

/// A typed data variable. Two variables are the same iff name and sort agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: Arc<str>,
    pub sort: Sort,
}

impl Variable {
    pub fn new(name: &str, sort: Sort) -> Self {
        Self {
            name: Arc::from(name),
            sort,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.sort)
    }
}
