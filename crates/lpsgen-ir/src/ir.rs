//! Linear process specifications.

use lpsgen_data::{DataExpr, Sort, Variable};
use std::fmt;
use std::sync::Arc;

/// The reserved label of the silent action.
pub const TAU: &str = "tau";

/// A linear process specification as delivered by a loader.
#[derive(Debug, Clone)]
pub struct Specification {
    /// Declared action labels.
    pub action_labels: Vec<ActionLabel>,
    /// Declared free (global) variables.
    pub global_variables: Vec<Variable>,
    /// The linear process.
    pub process: LinearProcess,
    /// Initial values of the process parameters.
    pub initial: Vec<Assignment>,
}

/// Ordered parameters and summands.
#[derive(Debug, Clone, Default)]
pub struct LinearProcess {
    pub parameters: Vec<Variable>,
    pub summands: Vec<Summand>,
}

/// A declared action label with its argument sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionLabel {
    pub name: Arc<str>,
    pub sorts: Vec<Sort>,
}

impl ActionLabel {
    pub fn new(name: &str, sorts: Vec<Sort>) -> Self {
        Self {
            name: Arc::from(name),
            sorts,
        }
    }
}

/// One action of a multi-action: a label applied to arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action {
    pub name: Arc<str>,
    pub args: Vec<DataExpr>,
}

impl Action {
    pub fn new(name: &str, args: Vec<DataExpr>) -> Self {
        Self {
            name: Arc::from(name),
            args,
        }
    }
}

/// A multi-action. The empty multi-action is `tau`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MultiAction {
    pub actions: Vec<Action>,
}

impl MultiAction {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn single(name: &str, args: Vec<DataExpr>) -> Self {
        Self::new(vec![Action::new(name, args)])
    }

    pub fn tau() -> Self {
        Self::default()
    }

    pub fn is_tau(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Display for MultiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "{}", TAU);
        }
        for (i, a) in self.actions.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", a.name)?;
            if !a.args.is_empty() {
                write!(f, "(")?;
                for (j, arg) in a.args.iter().enumerate() {
                    if j > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")?;
            }
        }
        Ok(())
    }
}

/// `lhs := rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub lhs: Variable,
    pub rhs: DataExpr,
}

impl Assignment {
    pub fn new(lhs: &Variable, rhs: DataExpr) -> Self {
        Self {
            lhs: lhs.clone(),
            rhs,
        }
    }
}

/// A guarded transition rule:
/// `sum vars. condition -> action @ time . P(assignments)`.
#[derive(Debug, Clone)]
pub struct Summand {
    /// Existentially quantified variables.
    pub summation_variables: Vec<Variable>,
    /// Guard.
    pub condition: DataExpr,
    /// The multi-action, or None for inaction (delta).
    pub action: Option<MultiAction>,
    /// Optional time stamp.
    pub time: Option<DataExpr>,
    /// Next-state assignments. Parameters without an assignment keep their value.
    pub assignments: Vec<Assignment>,
}

impl Summand {
    pub fn new(condition: DataExpr, action: MultiAction, assignments: Vec<Assignment>) -> Self {
        Self {
            summation_variables: Vec::new(),
            condition,
            action: Some(action),
            time: None,
            assignments,
        }
    }

    /// An inaction summand `condition -> delta`.
    pub fn delta(condition: DataExpr) -> Self {
        Self {
            summation_variables: Vec::new(),
            condition,
            action: None,
            time: None,
            assignments: Vec::new(),
        }
    }

    pub fn with_summation(mut self, vars: Vec<Variable>) -> Self {
        self.summation_variables = vars;
        self
    }

    pub fn with_time(mut self, time: DataExpr) -> Self {
        self.time = Some(time);
        self
    }

    pub fn is_delta(&self) -> bool {
        self.action.is_none()
    }

    pub fn is_timed(&self) -> bool {
        self.time.is_some()
    }

    /// The right-hand side assigned to `param`, if any.
    pub fn assignment_for(&self, param: &Variable) -> Option<&DataExpr> {
        self.assignments
            .iter()
            .find(|a| &a.lhs == param)
            .map(|a| &a.rhs)
    }
}

impl Specification {
    pub fn new(process: LinearProcess, initial: Vec<Assignment>) -> Self {
        Self {
            action_labels: Vec::new(),
            global_variables: Vec::new(),
            process,
            initial,
        }
    }

    /// The initial value of `param`, if one is given.
    pub fn initial_value(&self, param: &Variable) -> Option<&DataExpr> {
        self.initial
            .iter()
            .find(|a| &a.lhs == param)
            .map(|a| &a.rhs)
    }
}
