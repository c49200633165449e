//! Lazy, resumable enumeration of the transitions of one state.

use crate::arena::{GeneratorId, SubstitutionArena};
use crate::codec::State;
use crate::error::{GenerateError, GenerateResult};
use crate::nextstate::NextState;
use crate::table::SummandEntry;
use lpsgen_data::{Rewriter, TermId, TermPool, Valuation, ValuationStream};
use lpsgen_ir::{Action, MultiAction, TAU};
use smallvec::SmallVec;
use std::mem;
use std::sync::Arc;
use tracing::trace;

/// One action of a transition label, arguments in normal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionInstance {
    pub label: Arc<str>,
    pub args: SmallVec<[TermId; 4]>,
}

/// An outgoing transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    /// The multi-action; empty for tau.
    pub actions: Vec<ActionInstance>,
    pub target: State,
    /// Produced by a summand in the prioritised prefix of the table.
    pub prioritised: bool,
    /// Position of the producing summand in the linear process.
    pub summand: usize,
}

impl Transition {
    pub fn is_tau(&self) -> bool {
        self.actions.is_empty()
    }

    /// The multi-action in external form. None if an argument has no
    /// external form.
    pub fn to_external(&self, rewriter: &dyn Rewriter) -> Option<MultiAction> {
        let actions = self
            .actions
            .iter()
            .map(|a| {
                let args = a
                    .args
                    .iter()
                    .map(|t| rewriter.from_internal(*t))
                    .collect::<Option<Vec<_>>>()?;
                Some(Action {
                    name: a.label.clone(),
                    args,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(MultiAction::new(actions))
    }

    /// Render the multi-action, e.g. `a(1, true)|b` or `tau`.
    pub fn label(&self, pool: &TermPool) -> String {
        if self.actions.is_empty() {
            return TAU.to_string();
        }
        let parts: Vec<String> = self
            .actions
            .iter()
            .map(|a| {
                if a.args.is_empty() {
                    a.label.to_string()
                } else {
                    let args: Vec<String> = a.args.iter().map(|t| pool.display(*t)).collect();
                    format!("{}({})", a.label, args.join(", "))
                }
            })
            .collect();
        parts.join("|")
    }
}

/// Where a generator is in its walk over the summand table.
enum Phase {
    /// About to open the valuation stream of table position `summand`.
    Created { summand: usize },
    /// Pulling valuations of table position `summand`.
    Enumerating {
        summand: usize,
        stream: Box<dyn ValuationStream>,
    },
    /// The last call failed on `summand`; its stream was dropped.
    Aborted { summand: usize },
    Exhausted,
}

/// A lazy stream of the transitions of one source state.
///
/// Generators of the same engine may be interleaved freely. Each pull makes
/// sure the engine's substitution holds this generator's source state before
/// evaluating anything.
pub struct NextStateGenerator<'a> {
    ns: &'a NextState,
    id: GeneratorId,
    state: State,
    single: bool,
    phase: Phase,
}

impl<'a> NextStateGenerator<'a> {
    pub(crate) fn new(ns: &'a NextState, id: GeneratorId, state: State, only: Option<usize>) -> Self {
        Self {
            ns,
            id,
            state,
            single: only.is_some(),
            phase: Phase::Created {
                summand: only.unwrap_or(0),
            },
        }
    }

    /// The state whose transitions are generated.
    pub fn current_state(&self) -> State {
        self.state
    }

    /// Table position of the summand being enumerated, or None when exhausted.
    pub fn current_summand(&self) -> Option<usize> {
        match self.phase {
            Phase::Created { summand }
            | Phase::Enumerating { summand, .. }
            | Phase::Aborted { summand } => Some(summand),
            Phase::Exhausted => None,
        }
    }

    /// Restart on `state` over all summands.
    pub fn reset(&mut self, state: State) {
        self.restart(state, false, 0);
    }

    /// Restart on `state` over the summand at table position `index` only.
    pub fn reset_summand(&mut self, state: State, index: usize) -> GenerateResult<()> {
        self.ns.check_summand(index)?;
        self.restart(state, true, index);
        Ok(())
    }

    fn restart(&mut self, state: State, single: bool, summand: usize) {
        self.ns.arena().borrow_mut().release(self.id);
        self.state = state;
        self.single = single;
        self.phase = Phase::Created { summand };
    }

    /// Produce the next transition, or `Ok(None)` when there are no more.
    ///
    /// After an error the generator stays on the failing summand; the next
    /// call moves on to the following one.
    pub fn next_transition(&mut self) -> GenerateResult<Option<Transition>> {
        let ns = self.ns;
        loop {
            match mem::replace(&mut self.phase, Phase::Exhausted) {
                Phase::Exhausted => return Ok(None),
                Phase::Aborted { summand } => self.phase = self.after(summand),
                Phase::Created { summand } => {
                    let Some(entry) = ns.table().get(summand) else {
                        return Ok(None);
                    };
                    match self.open(entry) {
                        Ok(stream) => self.phase = Phase::Enumerating { summand, stream },
                        Err(e) => {
                            self.phase = Phase::Aborted { summand };
                            return Err(e);
                        }
                    }
                }
                Phase::Enumerating { summand, mut stream } => {
                    let Some(entry) = ns.table().get(summand) else {
                        return Ok(None);
                    };
                    match self.pull(summand, entry, stream.as_mut()) {
                        Ok(Some(transition)) => {
                            self.phase = Phase::Enumerating { summand, stream };
                            return Ok(Some(transition));
                        }
                        Ok(None) => self.phase = self.after(summand),
                        Err(e) => {
                            self.phase = Phase::Aborted { summand };
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    fn after(&self, summand: usize) -> Phase {
        if self.single || summand + 1 >= self.ns.summand_count() {
            Phase::Exhausted
        } else {
            Phase::Created {
                summand: summand + 1,
            }
        }
    }

    /// Bind this generator's state into the shared substitution.
    fn own(&self, arena: &mut SubstitutionArena) -> GenerateResult<()> {
        let ns = self.ns;
        arena
            .ensure_owner(self.id, self.state, ns.codec(), ns.pool(), ns.param_terms())
            .ok_or(GenerateError::MalformedState(self.state))
    }

    fn open(&self, entry: &SummandEntry) -> GenerateResult<Box<dyn ValuationStream>> {
        let ns = self.ns;
        let mut arena = ns.arena().borrow_mut();
        self.own(&mut arena)?;
        ns.enumerator()
            .solve(ns.rewriter(), &entry.summation_vars, entry.condition, arena.sigma())
            .map_err(|source| GenerateError::Enumerate {
                summand: entry.index,
                source,
            })
    }

    fn pull(
        &self,
        position: usize,
        entry: &SummandEntry,
        stream: &mut dyn ValuationStream,
    ) -> GenerateResult<Option<Transition>> {
        let ns = self.ns;
        let mut arena = ns.arena().borrow_mut();
        self.own(&mut arena)?;

        let valuation = match stream.next_valuation(ns.rewriter(), arena.sigma()) {
            None => return Ok(None),
            Some(Err(source)) => {
                return Err(GenerateError::Enumerate {
                    summand: entry.index,
                    source,
                })
            }
            Some(Ok(v)) => v,
        };

        arena.bind_summation_variables(&entry.summation_vars, &valuation);
        let result = self.fire(position, entry, &valuation, &arena);
        arena.unbind(&entry.summation_vars);
        if entry.shadows_parameter {
            arena.release(self.id);
        }
        result.map(Some)
    }

    /// Build the transition for one valuation. Summation variables are bound.
    fn fire(
        &self,
        position: usize,
        entry: &SummandEntry,
        valuation: &Valuation,
        arena: &SubstitutionArena,
    ) -> GenerateResult<Transition> {
        let ns = self.ns;
        let rewriter = ns.rewriter();
        let pool = ns.pool();
        let sigma = arena.sigma();
        let rewrite_error = |source| GenerateError::Rewrite {
            summand: entry.index,
            source,
        };

        if !valuation.is_exact() {
            let residual = rewriter.rewrite(entry.condition, sigma).map_err(rewrite_error)?;
            return Err(GenerateError::EvaluationIncomplete {
                summand: entry.index,
                term: pool.display(residual),
            });
        }

        let mut actions = Vec::with_capacity(entry.actions.len());
        for template in &entry.actions {
            actions.push(ActionInstance {
                label: template.label.clone(),
                args: rewriter.rewrite_list(&template.args, sigma).map_err(rewrite_error)?,
            });
        }

        let mut changes: SmallVec<[(usize, TermId); 8]> = SmallVec::new();
        for (i, rhs) in entry.assignments.iter().enumerate() {
            let Some(rhs) = rhs else { continue };
            let value = rewriter.rewrite(*rhs, sigma).map_err(rewrite_error)?;
            let old = if entry.shadows_parameter {
                ns.codec().field(pool, self.state, i)
            } else {
                sigma.get(ns.param_terms()[i])
            };
            if old != Some(value) {
                changes.push((i, value));
            }
        }
        let target = ns
            .codec()
            .update(pool, self.state, &changes)
            .ok_or(GenerateError::MalformedState(self.state))?;

        let transition = Transition {
            actions,
            target,
            prioritised: ns.is_prioritised_summand(position),
            summand: entry.index,
        };
        trace!(
            summand = entry.index,
            action = %transition.label(pool),
            changed = changes.len(),
            "transition"
        );
        Ok(transition)
    }
}

impl Iterator for NextStateGenerator<'_> {
    type Item = GenerateResult<Transition>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_transition().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NextStateConfig, StateFormat};
    use lpsgen_data::{DataExpr, Sort, Variable};
    use lpsgen_ir::{Assignment, LinearProcess, Specification, Summand};

    /// Two bits; `flip_a` toggles a, `set_b(d)` sets b to any d.
    fn bits(format: StateFormat) -> NextState {
        let a = Variable::new("a", Sort::Bool);
        let b = Variable::new("b", Sort::Bool);
        let d = Variable::new("d", Sort::Bool);
        let flip = Summand::new(
            DataExpr::Bool(true),
            MultiAction::single("flip_a", vec![]),
            vec![Assignment::new(&a, DataExpr::not(DataExpr::var(&a)))],
        );
        let set = Summand::new(
            DataExpr::Bool(true),
            MultiAction::single("set_b", vec![DataExpr::var(&d)]),
            vec![Assignment::new(&b, DataExpr::var(&d))],
        )
        .with_summation(vec![d]);
        let spec = Specification::new(
            LinearProcess {
                parameters: vec![a.clone(), b.clone()],
                summands: vec![flip, set],
            },
            vec![
                Assignment::new(&a, DataExpr::Bool(false)),
                Assignment::new(&b, DataExpr::Bool(false)),
            ],
        );
        NextState::with_reference_oracles(&spec, NextStateConfig::new(format, Default::default()))
            .unwrap()
    }

    #[test]
    fn test_generates_in_table_order() {
        for format in [StateFormat::Vector, StateFormat::Tree] {
            let ns = bits(format);
            let init = ns.initial_state();
            let ts: Vec<Transition> = ns.make_generator(init).collect::<Result<_, _>>().unwrap();
            let labels: Vec<String> = ts.iter().map(|t| t.label(ns.pool())).collect();
            assert_eq!(labels, vec!["flip_a", "set_b(false)", "set_b(true)"]);

            assert_eq!(ns.decode(ts[0].target).unwrap(), vec![DataExpr::Bool(true), DataExpr::Bool(false)]);
            assert_eq!(ts[1].target, init);
            assert_eq!(ns.decode(ts[2].target).unwrap(), vec![DataExpr::Bool(false), DataExpr::Bool(true)]);
            assert!(ts.iter().all(|t| !t.prioritised));
            assert_eq!(ts.iter().map(|t| t.summand).collect::<Vec<_>>(), vec![0, 1, 1]);
        }
    }

    #[test]
    fn test_exhausted_stays_exhausted() {
        let ns = bits(StateFormat::Vector);
        let mut g = ns.make_generator(ns.initial_state());
        while g.next_transition().unwrap().is_some() {}
        assert_eq!(g.current_summand(), None);
        assert!(g.next_transition().unwrap().is_none());
    }

    #[test]
    fn test_summand_generator_and_reset() {
        let ns = bits(StateFormat::Tree);
        let init = ns.initial_state();
        let mut g = ns.make_summand_generator(init, 1).unwrap();
        assert_eq!(g.by_ref().count(), 2);

        g.reset_summand(init, 0).unwrap();
        let t = g.next_transition().unwrap().unwrap();
        assert_eq!(t.label(ns.pool()), "flip_a");
        assert!(g.next_transition().unwrap().is_none());

        g.reset(t.target);
        assert_eq!(g.current_state(), t.target);
        assert_eq!(g.count(), 3);
    }

    #[test]
    fn test_reset_rebinds_parameters() {
        let ns = bits(StateFormat::Vector);
        let init = ns.initial_state();
        let mut g = ns.make_summand_generator(init, 0).unwrap();
        let t = g.next_transition().unwrap().unwrap();
        g.reset_summand(t.target, 0).unwrap();
        let back = g.next_transition().unwrap().unwrap();
        assert_eq!(back.target, init);
    }

    #[test]
    fn test_to_external() {
        let ns = bits(StateFormat::Vector);
        let ts: Vec<Transition> = ns
            .make_summand_generator(ns.initial_state(), 1)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let ma = ts[1].to_external(ns.rewriter()).unwrap();
        assert_eq!(ma, MultiAction::single("set_b", vec![DataExpr::Bool(true)]));
    }

    #[test]
    fn test_interleaved_generators_switch_owner() {
        let ns = bits(StateFormat::Tree);
        let init = ns.initial_state();
        let other = ns
            .state_from_values(&[DataExpr::Bool(true), DataExpr::Bool(true)])
            .unwrap();
        let mut g1 = ns.make_generator(init);
        let mut g2 = ns.make_generator(other);

        let a1 = g1.next_transition().unwrap().unwrap();
        let a2 = g2.next_transition().unwrap().unwrap();
        assert_eq!(ns.decode(a1.target).unwrap()[0], DataExpr::Bool(true));
        assert_eq!(ns.decode(a2.target).unwrap()[0], DataExpr::Bool(false));
        assert_eq!(ns.arena_rebinds(), 2);
    }
}
