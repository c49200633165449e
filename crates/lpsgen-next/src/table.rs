//! Summand table: the summands of a linear process in internal form.

use crate::config::SubstitutionMode;
use crate::error::{SpecResult, SpecificationError, Warning};
use ahash::AHashMap;
use lpsgen_data::{DataExpr, Rewriter, TermId, Variable};
use lpsgen_ir::{free_variables, Specification, Summand, TAU};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// One action of a summand's multi-action, arguments in internal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTemplate {
    pub label: Arc<str>,
    pub args: SmallVec<[TermId; 4]>,
}

/// A summand ready for evaluation.
#[derive(Debug, Clone)]
pub struct SummandEntry {
    /// Position of the summand in the linear process.
    pub index: usize,
    pub summation_vars: SmallVec<[TermId; 4]>,
    pub condition: TermId,
    /// Empty for tau.
    pub actions: Vec<ActionTemplate>,
    /// One slot per parameter; None keeps the parameter's value.
    pub assignments: Vec<Option<TermId>>,
    /// A summation variable has the same name and sort as a parameter.
    pub shadows_parameter: bool,
}

impl SummandEntry {
    pub fn is_tau(&self) -> bool {
        self.actions.is_empty()
    }

    /// True if the multi-action is non-empty and every action carries `label`.
    pub fn only_action(&self, label: &str) -> bool {
        !self.actions.is_empty() && self.actions.iter().all(|a| &*a.label == label)
    }

    fn matches_priority(&self, label: &str) -> bool {
        if label == TAU {
            self.is_tau()
        } else {
            self.only_action(label)
        }
    }
}

/// Representatives substituted for free variables in dummy mode.
#[derive(Debug, Clone, Default)]
pub struct DummyValues {
    values: AHashMap<Variable, DataExpr>,
}

impl DummyValues {
    pub fn new(
        spec: &Specification,
        rewriter: &dyn Rewriter,
        mode: SubstitutionMode,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let mut values = AHashMap::new();
        if mode == SubstitutionMode::Exact {
            return Self { values };
        }
        for var in free_variables(spec) {
            match rewriter.representative(&var.sort) {
                Some(value) => {
                    debug!(variable = %var, value = %value, "dummy representative");
                    values.insert(var, value);
                }
                None => warnings.push(Warning::NoRepresentative {
                    variable: var.name.to_string(),
                    sort: var.sort.to_string(),
                }),
            }
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute representatives into `expr`, leaving `bound` variables alone.
    pub fn apply(&self, expr: &DataExpr, bound: &[Variable]) -> DataExpr {
        if self.values.is_empty() {
            return expr.clone();
        }
        expr.substitute(&|v: &Variable| {
            if bound.contains(v) {
                None
            } else {
                self.values.get(v).cloned()
            }
        })
    }
}

#[derive(Debug, Clone, Default)]
struct PriorityPartition {
    labels: Vec<Arc<str>>,
    count: usize,
}

/// The summands in evaluation order. The first `num_prioritised()` entries
/// form the prioritised prefix.
#[derive(Debug, Clone)]
pub struct SummandTable {
    entries: Vec<SummandEntry>,
    priority: PriorityPartition,
}

impl SummandTable {
    /// Convert the summands of `spec`. Inaction summands are dropped and time
    /// stamps ignored, with one warning for all timed summands.
    pub fn build(
        spec: &Specification,
        rewriter: &dyn Rewriter,
        dummies: &DummyValues,
        warnings: &mut Vec<Warning>,
    ) -> SpecResult<Self> {
        if let Some(label) = spec.action_labels.iter().find(|l| &*l.name == TAU) {
            return Err(SpecificationError::ReservedActionLabel(label.name.to_string()));
        }

        let params = &spec.process.parameters;
        let summands = &spec.process.summands;
        let timed = summands.iter().filter(|s| s.is_timed()).count();
        if timed > 0 {
            warnings.push(Warning::TimingIgnored { summands: timed });
        }

        let mut entries = Vec::with_capacity(summands.len());
        for (index, summand) in summands.iter().enumerate() {
            let Some(action) = &summand.action else {
                continue;
            };
            check_assignments(index, summand, params)?;
            check_well_formed(index, summand)?;

            let bound = &summand.summation_variables;
            let internal = |e: &DataExpr| rewriter.to_internal(&dummies.apply(e, bound));

            let mut actions = Vec::with_capacity(action.actions.len());
            for a in &action.actions {
                if &*a.name == TAU {
                    return Err(SpecificationError::ReservedActionLabel(a.name.to_string()));
                }
                actions.push(ActionTemplate {
                    label: a.name.clone(),
                    args: a.args.iter().map(internal).collect(),
                });
            }

            let assignments = params
                .iter()
                .map(|p| match summand.assignment_for(p) {
                    Some(DataExpr::Var(v)) if v == p => None,
                    Some(rhs) => Some(internal(rhs)),
                    None => None,
                })
                .collect();

            entries.push(SummandEntry {
                index,
                summation_vars: bound.iter().map(|v| rewriter.pool().var(v)).collect(),
                condition: internal(&summand.condition),
                actions,
                assignments,
                shadows_parameter: bound.iter().any(|v| params.contains(v)),
            });
        }

        debug!(
            summands = entries.len(),
            dropped = summands.len() - entries.len(),
            timed,
            "built summand table"
        );
        Ok(Self {
            entries,
            priority: PriorityPartition::default(),
        })
    }

    /// Move every summand whose multi-action consists of `label` only (for
    /// `tau`: the empty multi-action) behind the current prioritised prefix,
    /// keeping relative order. Returns the number of summands moved.
    pub fn prioritise(&mut self, label: &str) -> usize {
        if self.priority.labels.iter().any(|l| &**l == label) {
            return 0;
        }
        let start = self.priority.count;
        let rest = self.entries.split_off(start);
        let (front, back): (Vec<_>, Vec<_>) =
            rest.into_iter().partition(|e| e.matches_priority(label));
        let moved = front.len();
        self.entries.extend(front);
        self.entries.extend(back);

        self.priority.count += moved;
        self.priority.labels.push(Arc::from(label));
        debug!(label, moved, total = self.priority.count, "prioritised summands");
        moved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&SummandEntry> {
        self.entries.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SummandEntry> {
        self.entries.iter()
    }

    pub fn num_prioritised(&self) -> usize {
        self.priority.count
    }

    pub fn is_prioritised(&self, i: usize) -> bool {
        i < self.priority.count
    }

    pub fn prioritised_labels(&self) -> impl Iterator<Item = &str> {
        self.priority.labels.iter().map(|l| &**l)
    }
}

fn check_assignments(index: usize, summand: &Summand, params: &[Variable]) -> SpecResult<()> {
    match summand.assignments.iter().find(|a| !params.contains(&a.lhs)) {
        Some(a) => Err(SpecificationError::AssignmentToNonParameter {
            summand: index,
            variable: a.lhs.name.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_well_formed(index: usize, summand: &Summand) -> SpecResult<()> {
    let actions = summand
        .action
        .iter()
        .flat_map(|ma| ma.actions.iter().flat_map(|a| a.args.iter()));
    let bad = std::iter::once(&summand.condition)
        .chain(actions)
        .chain(summand.assignments.iter().map(|a| &a.rhs))
        .find_map(|e| e.malformed());
    match bad {
        Some(e) => Err(SpecificationError::MalformedExpression {
            location: format!("summand {}", index),
            expr: format!("{:?}", e),
        }),
        None => Ok(()),
    }
}
