//! Errors and warnings of the next-state engine.

use crate::codec::State;
use lpsgen_data::{EnumerateError, RewriteError};
use std::fmt;
use thiserror::Error;

/// Fatal problem with the specification, detected while building an engine.
#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("parameter '{parameter}' does not have an initial value")]
    MissingInitialValue { parameter: String },

    #[error("action label '{0}' is reserved for the internal action")]
    ReservedActionLabel(String),

    #[error("summand {summand} assigns to '{variable}', which is not a process parameter")]
    AssignmentToNonParameter { summand: usize, variable: String },

    #[error("malformed expression in {location}: {expr}")]
    MalformedExpression { location: String, expr: String },

    #[error("cannot rewrite initial value of '{parameter}': {source}")]
    Rewrite {
        parameter: String,
        #[source]
        source: RewriteError,
    },
}

pub type SpecResult<T> = Result<T, SpecificationError>;

/// Failure while generating the transitions of a state.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("summand {summand}: condition does not rewrite to true or false: {term}")]
    EvaluationIncomplete { summand: usize, term: String },

    #[error("summand {summand}: {source}")]
    Rewrite {
        summand: usize,
        #[source]
        source: RewriteError,
    },

    #[error("summand {summand}: {source}")]
    Enumerate {
        summand: usize,
        #[source]
        source: EnumerateError,
    },

    #[error("summand index {index} out of range ({len} summands)")]
    SummandOutOfRange { index: usize, len: usize },

    #[error("malformed state {0:?}")]
    MalformedState(State),
}

pub type GenerateResult<T> = Result<T, GenerateError>;

/// Problem converting between packed states and external values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("expected {expected} values, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("value {value} does not inhabit the sort of parameter '{parameter}'")]
    SortMismatch { parameter: String, value: String },

    #[error("field {index} out of range ({len} parameters)")]
    FieldOutOfRange { index: usize, len: usize },

    #[error("malformed state {0:?}")]
    Malformed(State),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

pub type StateResult<T> = Result<T, StateError>;

/// Non-fatal advisory produced while building an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Some summands carry a time stamp; time is ignored.
    TimingIgnored { summands: usize },
    /// Dummy mode found no representative for a free variable, which stays free.
    NoRepresentative { variable: String, sort: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TimingIgnored { summands } => write!(
                f,
                "specification uses time ({} timed summands), which is not supported; ignoring timing",
                summands
            ),
            Warning::NoRepresentative { variable, sort } => write!(
                f,
                "no representative value of sort {} for free variable '{}'; it stays free",
                sort, variable
            ),
        }
    }
}
