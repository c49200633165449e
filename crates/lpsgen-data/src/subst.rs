//! Variable substitutions over interned terms.

use crate::term::TermId;
use ahash::AHashMap;

/// A mapping from variable terms to (normal-form) value terms.
///
/// Keys are the interned ids of `Term::Var` nodes. Unmapped variables are
/// left in place by the rewriter.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: AHashMap<TermId, TermId>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: AHashMap::with_capacity(capacity),
        }
    }

    /// Bind `var` to `value`, replacing any previous binding.
    #[inline]
    pub fn assign(&mut self, var: TermId, value: TermId) {
        self.map.insert(var, value);
    }

    #[inline]
    pub fn get(&self, var: TermId) -> Option<TermId> {
        self.map.get(&var).copied()
    }

    /// Remove the binding of `var`, returning the old value.
    #[inline]
    pub fn remove(&mut self, var: TermId) -> Option<TermId> {
        self.map.remove(&var)
    }

    pub fn contains(&self, var: TermId) -> bool {
        self.map.contains_key(&var)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, TermId)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{Sort, Variable};
    use crate::term::TermPool;

    #[test]
    fn test_assign_remove() {
        let pool = TermPool::new();
        let x = pool.var(&Variable::new("x", Sort::Int));
        let one = pool.int(1);
        let two = pool.int(2);

        let mut sigma = Substitution::new();
        assert!(sigma.is_empty());
        sigma.assign(x, one);
        assert_eq!(sigma.get(x), Some(one));
        sigma.assign(x, two);
        assert_eq!(sigma.get(x), Some(two));
        assert_eq!(sigma.len(), 1);
        assert_eq!(sigma.remove(x), Some(two));
        assert!(!sigma.contains(x));
    }
}
