//! Shared substitution with owner tracking.
//!
//! All generators of one engine evaluate under a single substitution. The
//! parameters are bound to the fields of the owner's source state; a
//! generator that is not the owner rebinds them before its next evaluation.

use crate::codec::{State, StateCodec};
use lpsgen_data::{Substitution, TermId, TermPool, Valuation};

/// Identity of a generator, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneratorId(pub(crate) u64);

#[derive(Debug, Default)]
pub struct SubstitutionArena {
    sigma: Substitution,
    owner: Option<GeneratorId>,
    rebinds: u64,
}

impl SubstitutionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<GeneratorId> {
        self.owner
    }

    pub fn is_owner(&self, id: GeneratorId) -> bool {
        self.owner == Some(id)
    }

    /// Make `id` the owner, binding `params` to the fields of `state` if
    /// ownership changes. Returns None if `state` does not decode.
    pub fn ensure_owner(
        &mut self,
        id: GeneratorId,
        state: State,
        codec: &StateCodec,
        pool: &TermPool,
        params: &[TermId],
    ) -> Option<()> {
        if self.is_owner(id) {
            return Some(());
        }
        self.owner = None;
        let sigma = &mut self.sigma;
        codec.visit_fields(pool, state, |i, value| sigma.assign(params[i], value))?;
        self.owner = Some(id);
        self.rebinds += 1;
        Some(())
    }

    pub fn bind_summation_variables(&mut self, vars: &[TermId], valuation: &Valuation) {
        for (var, value) in vars.iter().zip(valuation.values()) {
            self.sigma.assign(*var, *value);
        }
    }

    pub fn unbind(&mut self, vars: &[TermId]) {
        for var in vars {
            self.sigma.remove(*var);
        }
    }

    /// Give up ownership if `id` holds it.
    pub fn release(&mut self, id: GeneratorId) {
        if self.is_owner(id) {
            self.owner = None;
        }
    }

    pub fn sigma(&self) -> &Substitution {
        &self.sigma
    }

    /// Number of ownership switches so far.
    pub fn rebinds(&self) -> u64 {
        self.rebinds
    }
}
