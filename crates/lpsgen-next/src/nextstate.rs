//! The next-state engine facade.

use crate::arena::{GeneratorId, SubstitutionArena};
use crate::codec::{State, StateCodec};
use crate::config::NextStateConfig;
use crate::error::{
    GenerateError, GenerateResult, SpecResult, SpecificationError, StateError, StateResult,
    Warning,
};
use crate::generator::NextStateGenerator;
use crate::table::{DummyValues, SummandTable};
use lpsgen_data::{
    DataExpr, DomainEnumerator, Enumerator, InnermostRewriter, Rewriter, Sort, Substitution, Term,
    TermId, TermPool, Variable,
};
use lpsgen_ir::{profile, Specification};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes the outgoing transitions of states of one linear process.
///
/// The engine owns the summand table, the state codec and the substitution
/// shared by all of its generators. Generators borrow the engine, so the
/// table cannot be reordered (see [`NextState::prioritise`]) while any of
/// them is alive. The engine is `Send` but not `Sync`; use
/// [`NextState::fork`] to get an independent engine for another thread.
pub struct NextState {
    rewriter: Arc<dyn Rewriter>,
    enumerator: Arc<dyn Enumerator>,
    table: Arc<SummandTable>,
    codec: Arc<StateCodec>,
    parameters: Arc<[Variable]>,
    param_terms: Arc<[TermId]>,
    initial: State,
    config: NextStateConfig,
    warnings: Arc<[Warning]>,
    arena: RefCell<SubstitutionArena>,
    next_id: Cell<u64>,
}

impl NextState {
    /// Build an engine for `spec`.
    pub fn build(
        spec: &Specification,
        rewriter: Arc<dyn Rewriter>,
        enumerator: Arc<dyn Enumerator>,
        config: NextStateConfig,
    ) -> SpecResult<Self> {
        let profile = profile(spec);
        debug!(
            %profile,
            format = %config.format,
            substitution = %config.substitution,
            "building next-state engine"
        );

        let mut warnings = Vec::new();
        let dummies = DummyValues::new(spec, rewriter.as_ref(), config.substitution, &mut warnings);
        let table = SummandTable::build(spec, rewriter.as_ref(), &dummies, &mut warnings)?;

        let parameters: Arc<[Variable]> = spec.process.parameters.clone().into();
        let pool = rewriter.pool();
        let param_terms: Arc<[TermId]> = parameters.iter().map(|p| pool.var(p)).collect();

        let empty = Substitution::new();
        let mut values = Vec::with_capacity(parameters.len());
        for p in parameters.iter() {
            let expr = spec
                .initial_value(p)
                .ok_or_else(|| SpecificationError::MissingInitialValue {
                    parameter: p.name.to_string(),
                })?;
            if let Some(bad) = expr.malformed() {
                return Err(SpecificationError::MalformedExpression {
                    location: format!("initial value of '{}'", p.name),
                    expr: format!("{:?}", bad),
                });
            }
            let term = rewriter.to_internal(&dummies.apply(expr, &[]));
            let value = rewriter
                .rewrite(term, &empty)
                .map_err(|source| SpecificationError::Rewrite {
                    parameter: p.name.to_string(),
                    source,
                })?;
            values.push(value);
        }

        let codec = StateCodec::new(config.format, parameters.len());
        let initial = codec.encode(pool, &values);

        for w in &warnings {
            warn!("{}", w);
        }
        debug!(
            summands = table.len(),
            initial = %pool.display(initial.term()),
            "next-state engine ready"
        );

        Ok(Self {
            rewriter,
            enumerator,
            table: Arc::new(table),
            codec: Arc::new(codec),
            parameters,
            param_terms,
            initial,
            config,
            warnings: warnings.into(),
            arena: RefCell::new(SubstitutionArena::new()),
            next_id: Cell::new(0),
        })
    }

    /// Build an engine with the built-in innermost rewriter and domain
    /// enumerator over a fresh term pool.
    pub fn with_reference_oracles(spec: &Specification, config: NextStateConfig) -> SpecResult<Self> {
        let rewriter = InnermostRewriter::new(Arc::new(TermPool::new()));
        Self::build(spec, Arc::new(rewriter), Arc::new(DomainEnumerator::new()), config)
    }

    pub fn initial_state(&self) -> State {
        self.initial
    }

    /// A generator for all transitions of `state`, in summand table order.
    pub fn make_generator(&self, state: State) -> NextStateGenerator<'_> {
        NextStateGenerator::new(self, self.fresh_id(), state, None)
    }

    /// A generator for the transitions of `state` by the summand at table
    /// position `index` only.
    pub fn make_summand_generator(
        &self,
        state: State,
        index: usize,
    ) -> GenerateResult<NextStateGenerator<'_>> {
        self.check_summand(index)?;
        Ok(NextStateGenerator::new(self, self.fresh_id(), state, Some(index)))
    }

    /// Move the summands whose multi-action consists of `label` only to the
    /// front of the table. Transitions they produce are flagged prioritised.
    /// Returns the number of summands moved.
    pub fn prioritise(&mut self, label: &str) -> usize {
        Arc::make_mut(&mut self.table).prioritise(label)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// A new engine sharing this one's table, codec, pool and oracles, with
    /// its own substitution. States of both engines are interchangeable.
    pub fn fork(&self) -> NextState {
        NextState {
            rewriter: Arc::clone(&self.rewriter),
            enumerator: Arc::clone(&self.enumerator),
            table: Arc::clone(&self.table),
            codec: Arc::clone(&self.codec),
            parameters: Arc::clone(&self.parameters),
            param_terms: Arc::clone(&self.param_terms),
            initial: self.initial,
            config: self.config,
            warnings: Arc::clone(&self.warnings),
            arena: RefCell::new(SubstitutionArena::new()),
            next_id: Cell::new(0),
        }
    }

    // === State access ===

    /// Number of fields per state (the number of parameters).
    pub fn state_len(&self) -> usize {
        self.codec.len()
    }

    /// Field `index` of `state` as an external expression.
    pub fn field(&self, state: State, index: usize) -> StateResult<DataExpr> {
        if index >= self.state_len() {
            return Err(StateError::FieldOutOfRange {
                index,
                len: self.state_len(),
            });
        }
        let term = self
            .codec
            .field(self.pool(), state, index)
            .ok_or(StateError::Malformed(state))?;
        self.rewriter
            .from_internal(term)
            .ok_or(StateError::Malformed(state))
    }

    /// All fields of `state` as external expressions.
    pub fn decode(&self, state: State) -> StateResult<Vec<DataExpr>> {
        let terms = self
            .codec
            .decode(self.pool(), state)
            .ok_or(StateError::Malformed(state))?;
        terms
            .into_iter()
            .map(|t| self.rewriter.from_internal(t).ok_or(StateError::Malformed(state)))
            .collect()
    }

    /// Pack external values, one per parameter, into a state.
    pub fn state_from_values(&self, values: &[DataExpr]) -> StateResult<State> {
        if values.len() != self.state_len() {
            return Err(StateError::WrongLength {
                expected: self.state_len(),
                actual: values.len(),
            });
        }
        let empty = Substitution::new();
        let pool = self.pool();
        let mut terms = Vec::with_capacity(values.len());
        for (param, value) in self.parameters.iter().zip(values) {
            let term = self.rewriter.to_internal(value);
            let term = if pool.is_value(term) {
                term
            } else {
                self.rewriter.rewrite(term, &empty)?
            };
            if !inhabits(pool, term, &param.sort) {
                return Err(StateError::SortMismatch {
                    parameter: param.name.to_string(),
                    value: pool.display(term),
                });
            }
            terms.push(term);
        }
        Ok(self.codec.encode(pool, &terms))
    }

    /// `state` re-packed as a flat vector term, whatever the configured format.
    pub fn to_vector(&self, state: State) -> StateResult<TermId> {
        self.codec
            .to_vector(self.pool(), state)
            .ok_or(StateError::Malformed(state))
    }

    // === Summand table ===

    pub fn summand_count(&self) -> usize {
        self.table.len()
    }

    pub fn num_prioritised(&self) -> usize {
        self.table.num_prioritised()
    }

    /// True if the summand at table position `index` is prioritised.
    pub fn is_prioritised_summand(&self, index: usize) -> bool {
        self.table.is_prioritised(index)
    }

    pub fn table(&self) -> &SummandTable {
        &self.table
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    pub fn rewriter(&self) -> &dyn Rewriter {
        self.rewriter.as_ref()
    }

    pub fn enumerator(&self) -> &dyn Enumerator {
        self.enumerator.as_ref()
    }

    pub fn pool(&self) -> &TermPool {
        self.rewriter.pool()
    }

    pub fn parameters(&self) -> &[Variable] {
        &self.parameters
    }

    pub fn config(&self) -> NextStateConfig {
        self.config
    }

    /// Number of times a generator had to rebind the parameters.
    pub fn arena_rebinds(&self) -> u64 {
        self.arena.borrow().rebinds()
    }

    pub(crate) fn param_terms(&self) -> &[TermId] {
        &self.param_terms
    }

    pub(crate) fn arena(&self) -> &RefCell<SubstitutionArena> {
        &self.arena
    }

    pub(crate) fn check_summand(&self, index: usize) -> GenerateResult<()> {
        if index < self.table.len() {
            Ok(())
        } else {
            Err(GenerateError::SummandOutOfRange {
                index,
                len: self.table.len(),
            })
        }
    }

    fn fresh_id(&self) -> GeneratorId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        GeneratorId(id)
    }
}

fn inhabits(pool: &TermPool, term: TermId, sort: &Sort) -> bool {
    match (pool.get(term), sort) {
        (Some(Term::Bool(_)), Sort::Bool) => true,
        (Some(Term::Int(_)), Sort::Int) => true,
        (Some(Term::Int(n)), Sort::Range { lo, hi }) => *lo <= n && n <= *hi,
        (Some(Term::Ctor(s, i)), Sort::Enum(e)) => s == *e && (i as usize) < e.constructors.len(),
        _ => false,
    }
}

impl std::fmt::Debug for NextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextState")
            .field("parameters", &self.parameters.len())
            .field("summands", &self.table.len())
            .field("prioritised", &self.table.num_prioritised())
            .field("config", &self.config)
            .field("initial", &self.initial)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateFormat;
    use lpsgen_data::EnumSort;
    use lpsgen_ir::{Assignment, LinearProcess, MultiAction, Summand};

    fn counter(format: StateFormat) -> NextState {
        let n = Variable::new("n", Sort::Range { lo: 0, hi: 3 });
        let b = Variable::new("b", Sort::Bool);
        let inc = Summand::new(
            DataExpr::lt(DataExpr::var(&n), DataExpr::Int(3)),
            MultiAction::single("inc", vec![DataExpr::var(&n)]),
            vec![Assignment::new(&n, DataExpr::add(DataExpr::var(&n), DataExpr::Int(1)))],
        );
        let spec = Specification::new(
            LinearProcess {
                parameters: vec![n.clone(), b.clone()],
                summands: vec![inc],
            },
            vec![
                Assignment::new(&n, DataExpr::add(DataExpr::Int(0), DataExpr::Int(1))),
                Assignment::new(&b, DataExpr::Bool(true)),
            ],
        );
        NextState::with_reference_oracles(&spec, NextStateConfig::new(format, Default::default()))
            .unwrap()
    }

    #[test]
    fn test_initial_values_rewritten() {
        for format in [StateFormat::Vector, StateFormat::Tree] {
            let ns = counter(format);
            let init = ns.initial_state();
            assert_eq!(ns.state_len(), 2);
            assert_eq!(ns.field(init, 0), Ok(DataExpr::Int(1)));
            assert_eq!(ns.decode(init), Ok(vec![DataExpr::Int(1), DataExpr::Bool(true)]));
        }
    }

    #[test]
    fn test_state_from_values() {
        let ns = counter(StateFormat::Tree);
        let s = ns
            .state_from_values(&[DataExpr::Int(1), DataExpr::Bool(true)])
            .unwrap();
        assert_eq!(s, ns.initial_state());

        assert_eq!(
            ns.state_from_values(&[DataExpr::Int(1)]),
            Err(StateError::WrongLength {
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            ns.state_from_values(&[DataExpr::Int(7), DataExpr::Bool(true)]),
            Err(StateError::SortMismatch { parameter, .. }) if parameter == "n"
        ));
        assert!(matches!(
            ns.state_from_values(&[DataExpr::Bool(false), DataExpr::Bool(true)]),
            Err(StateError::SortMismatch { .. })
        ));
        let sum = DataExpr::add(DataExpr::Int(1), DataExpr::Int(1));
        let s2 = ns.state_from_values(&[sum, DataExpr::Bool(false)]).unwrap();
        assert_eq!(ns.field(s2, 0), Ok(DataExpr::Int(2)));
    }

    #[test]
    fn test_field_out_of_range() {
        let ns = counter(StateFormat::Vector);
        assert_eq!(
            ns.field(ns.initial_state(), 2),
            Err(StateError::FieldOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_to_vector_agrees_across_formats() {
        let tree = counter(StateFormat::Tree);
        let vector = counter(StateFormat::Vector);
        let t = tree.to_vector(tree.initial_state()).unwrap();
        let v = vector.to_vector(vector.initial_state()).unwrap();
        assert_eq!(tree.pool().display(t), vector.pool().display(v));
        assert_eq!(vector.pool().display(v), "[1, true]");
    }

    #[test]
    fn test_summand_index_checked() {
        let ns = counter(StateFormat::Vector);
        assert!(ns.make_summand_generator(ns.initial_state(), 0).is_ok());
        assert!(matches!(
            ns.make_summand_generator(ns.initial_state(), 1),
            Err(GenerateError::SummandOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_inhabits_enum() {
        let pool = TermPool::new();
        let color = EnumSort::new("Color", &["red", "green"]);
        let other = EnumSort::new("Other", &["red"]);
        let red = pool.intern_expr(&DataExpr::ctor(&color, "red").unwrap());
        assert!(inhabits(&pool, red, &Sort::Enum(color)));
        assert!(!inhabits(&pool, red, &Sort::Enum(other)));
    }

    #[test]
    fn test_fork_shares_pool() {
        let ns = counter(StateFormat::Tree);
        let forked = ns.fork();
        assert_eq!(forked.initial_state(), ns.initial_state());
        assert!(std::ptr::eq(forked.pool(), ns.pool()));
        assert_eq!(forked.arena_rebinds(), 0);
    }
}
