//! Static analysis of linear process specifications.

use crate::ir::{Specification, Summand};
use lpsgen_data::{DataExpr, Variable};
use std::fmt;

/// Size profile of a specification, logged when an engine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecProfile {
    pub num_parameters: usize,
    pub num_summands: usize,
    /// Inaction summands (dropped by the engine).
    pub num_delta: usize,
    /// Timed summands (time is ignored by the engine).
    pub num_timed: usize,
    /// Upper bound on the number of states. None if an unbounded sort is present.
    pub state_space_bound: Option<u128>,
}

impl fmt::Display for SpecProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parameters, {} summands ({} delta, {} timed), state bound ",
            self.num_parameters, self.num_summands, self.num_delta, self.num_timed
        )?;
        match self.state_space_bound {
            Some(n) => write!(f, "{}", n),
            None => write!(f, "unbounded"),
        }
    }
}

/// Compute the size profile of a specification.
pub fn profile(spec: &Specification) -> SpecProfile {
    let summands = &spec.process.summands;
    let state_space_bound = spec
        .process
        .parameters
        .iter()
        .try_fold(1u128, |acc, p| {
            p.sort
                .cardinality()
                .map(|c| acc.saturating_mul(c as u128))
        });
    SpecProfile {
        num_parameters: spec.process.parameters.len(),
        num_summands: summands.len(),
        num_delta: summands.iter().filter(|s| s.is_delta()).count(),
        num_timed: summands.iter().filter(|s| s.is_timed()).count(),
        state_space_bound,
    }
}

/// Free variables of a specification: the declared global variables, followed
/// by every other variable that occurs in a summand or initial value without
/// being a parameter or a summation variable of that summand.
pub fn free_variables(spec: &Specification) -> Vec<Variable> {
    let params = &spec.process.parameters;
    let mut out: Vec<Variable> = spec.global_variables.clone();
    let mut note = |v: Variable, bound: &[Variable]| {
        if !params.contains(&v) && !bound.contains(&v) && !out.contains(&v) {
            out.push(v);
        }
    };

    for summand in &spec.process.summands {
        for e in summand_expressions(summand) {
            for v in e.variables() {
                note(v, &summand.summation_variables);
            }
        }
    }
    for a in &spec.initial {
        for v in a.rhs.variables() {
            note(v, &[]);
        }
    }
    out
}

/// Every expression of a summand, time included.
fn summand_expressions(summand: &Summand) -> impl Iterator<Item = &DataExpr> {
    let actions = summand
        .action
        .iter()
        .flat_map(|ma| ma.actions.iter().flat_map(|a| a.args.iter()));
    std::iter::once(&summand.condition)
        .chain(actions)
        .chain(summand.time.iter())
        .chain(summand.assignments.iter().map(|a| &a.rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Assignment, LinearProcess, MultiAction};
    use lpsgen_data::Sort;

    fn sample() -> (Specification, Variable, Variable, Variable) {
        let x = Variable::new("x", Sort::Bool);
        let n = Variable::new("n", Sort::Range { lo: 0, hi: 2 });
        let g = Variable::new("g", Sort::Bool);
        let d = Variable::new("d", Sort::Bool);
        let s1 = Summand::new(
            DataExpr::var(&d),
            MultiAction::single("a", vec![DataExpr::var(&g)]),
            vec![Assignment::new(&x, DataExpr::var(&d))],
        )
        .with_summation(vec![d.clone()]);
        let s2 = Summand::delta(DataExpr::var(&x)).with_time(DataExpr::Int(3));
        let process = LinearProcess {
            parameters: vec![x.clone(), n.clone()],
            summands: vec![s1, s2],
        };
        let spec = Specification::new(
            process,
            vec![
                Assignment::new(&x, DataExpr::Bool(false)),
                Assignment::new(&n, DataExpr::Int(0)),
            ],
        );
        (spec, x, n, g)
    }

    #[test]
    fn test_profile() {
        let (spec, ..) = sample();
        let p = profile(&spec);
        assert_eq!(p.num_parameters, 2);
        assert_eq!(p.num_summands, 2);
        assert_eq!(p.num_delta, 1);
        assert_eq!(p.num_timed, 1);
        assert_eq!(p.state_space_bound, Some(6));
        assert_eq!(
            p.to_string(),
            "2 parameters, 2 summands (1 delta, 1 timed), state bound 6"
        );
    }

    #[test]
    fn test_free_variables() {
        let (mut spec, _, _, g) = sample();
        assert_eq!(free_variables(&spec), vec![g.clone()]);

        let h = Variable::new("h", Sort::Int);
        spec.global_variables.push(h.clone());
        assert_eq!(free_variables(&spec), vec![h, g]);
    }

    #[test]
    fn test_unbounded_profile() {
        let (mut spec, ..) = sample();
        spec.process.parameters.push(Variable::new("k", Sort::Int));
        assert_eq!(profile(&spec).state_space_bound, None);
    }
}
