//! Packed state representation.
//!
//! A state is an interned term: either one `Vector` node holding all N fields,
//! or a balanced binary tree of `Pair` nodes whose leaves are the fields.
//! Because the term pool hash-conses every node, two states with the same
//! fields are the same [`State`], and trees that differ in one field share
//! every subtree off the path to that field.
//!
//! Tree shape for N = 5 (m = 4, deficit 1, so leaves 3 and 4 are paired first):
//! ```text
//!              root
//!            /      \
//!        (0,1)     (2,(3,4))
//!        /   \      /     \
//!       0     1    2     (3,4)
//!                        /   \
//!                       3     4
//! ```
//! Lookup bisects the index range `[0, N)` at its midpoint at every level,
//! which visits exactly the nodes built above.

use crate::config::StateFormat;
use lpsgen_data::{TermId, TermPool};
use std::fmt;

/// A packed state: a handle into the term pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(TermId);

impl State {
    /// The term this state is packed into.
    #[inline]
    pub fn term(self) -> TermId {
        self.0
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State({:?})", self.0)
    }
}

/// Marks which leaves are merged with their left neighbour before the
/// pairwise rounds, so that exactly a power of two of elements remains.
/// `init[i] == true` pairs leaf `i - 1` with leaf `i`.
fn fill_tree_init(init: &mut [bool], deficit: usize) {
    if deficit == 0 {
        return;
    }
    let n = init.len();
    if n > 2 {
        let (left, right) = init.split_at_mut(n / 2);
        fill_tree_init(left, deficit / 2);
        fill_tree_init(right, deficit - deficit / 2);
    } else {
        debug_assert_eq!(n, 2);
        init[1] = true;
    }
}

/// Encoder/decoder between field vectors and packed states.
#[derive(Debug, Clone)]
pub struct StateCodec {
    format: StateFormat,
    len: usize,
    tree_init: Vec<bool>,
}

impl StateCodec {
    pub fn new(format: StateFormat, len: usize) -> Self {
        let mut tree_init = vec![false; len];
        if format == StateFormat::Tree && len > 0 {
            let m = 1usize << (usize::BITS - 1 - len.leading_zeros());
            fill_tree_init(&mut tree_init, len - m);
        }
        Self {
            format,
            len,
            tree_init,
        }
    }

    #[inline]
    pub fn format(&self) -> StateFormat {
        self.format
    }

    /// Number of fields per state.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pack `values` (exactly `len()` of them) into a state.
    pub fn encode(&self, pool: &TermPool, values: &[TermId]) -> State {
        assert_eq!(values.len(), self.len, "state length mismatch");
        if self.len == 0 {
            return State(pool.nil());
        }
        match self.format {
            StateFormat::Vector => State(pool.vector(values)),
            StateFormat::Tree => State(self.build_tree(pool, values)),
        }
    }

    fn build_tree(&self, pool: &TermPool, values: &[TermId]) -> TermId {
        let mut args: Vec<TermId> = Vec::with_capacity(self.len);
        for (&v, &merge) in values.iter().zip(&self.tree_init) {
            match args.last_mut() {
                Some(last) if merge => *last = pool.pair(*last, v),
                _ => args.push(v),
            }
        }

        let mut n = args.len();
        debug_assert!(n.is_power_of_two());
        while n > 1 {
            for i in (0..n).step_by(2) {
                args[i / 2] = pool.pair(args[i], args[i + 1]);
            }
            n /= 2;
        }
        args[0]
    }

    /// Read field `index`. None if the index is out of range or the term is
    /// not a state of this codec.
    pub fn field(&self, pool: &TermPool, state: State, index: usize) -> Option<TermId> {
        if index >= self.len {
            return None;
        }
        match self.format {
            StateFormat::Vector => pool.vector_arg(state.0, index),
            StateFormat::Tree => {
                let mut tree = state.0;
                let (mut lo, mut hi) = (0, self.len);
                while lo + 1 != hi {
                    let mid = (lo + hi) / 2;
                    let (left, right) = pool.pair_children(tree)?;
                    if index < mid {
                        tree = left;
                        hi = mid;
                    } else {
                        tree = right;
                        lo = mid;
                    }
                }
                Some(tree)
            }
        }
    }

    /// Call `f(i, value)` for every field in index order.
    pub fn visit_fields<F>(&self, pool: &TermPool, state: State, mut f: F) -> Option<()>
    where
        F: FnMut(usize, TermId),
    {
        if self.len == 0 {
            return Some(());
        }
        match self.format {
            StateFormat::Vector => {
                for i in 0..self.len {
                    f(i, pool.vector_arg(state.0, i)?);
                }
                Some(())
            }
            StateFormat::Tree => visit_tree(pool, state.0, 0, self.len, &mut f),
        }
    }

    /// Unpack all fields.
    pub fn decode(&self, pool: &TermPool, state: State) -> Option<Vec<TermId>> {
        let mut out = Vec::with_capacity(self.len);
        self.visit_fields(pool, state, |_, v| out.push(v))?;
        Some(out)
    }

    /// Replace some fields. Tree states rebuild only the paths to the changed
    /// leaves; all other subtrees are reused as they are.
    pub fn update(&self, pool: &TermPool, state: State, changes: &[(usize, TermId)]) -> Option<State> {
        if changes.is_empty() {
            return Some(state);
        }
        match self.format {
            StateFormat::Vector => {
                let mut values = self.decode(pool, state)?;
                for &(i, v) in changes {
                    *values.get_mut(i)? = v;
                }
                Some(State(pool.vector(&values)))
            }
            StateFormat::Tree => {
                let mut root = state.0;
                for &(i, v) in changes {
                    if i >= self.len {
                        return None;
                    }
                    root = replace_leaf(pool, root, 0, self.len, i, v)?;
                }
                Some(State(root))
            }
        }
    }

    /// Re-pack a state of this codec as a flat vector term.
    pub fn to_vector(&self, pool: &TermPool, state: State) -> Option<TermId> {
        match self.format {
            StateFormat::Vector => Some(state.0),
            StateFormat::Tree if self.len == 0 => Some(state.0),
            StateFormat::Tree => Some(pool.vector(&self.decode(pool, state)?)),
        }
    }
}

fn visit_tree<F>(pool: &TermPool, tree: TermId, lo: usize, hi: usize, f: &mut F) -> Option<()>
where
    F: FnMut(usize, TermId),
{
    if lo + 1 == hi {
        f(lo, tree);
        return Some(());
    }
    let mid = (lo + hi) / 2;
    let (left, right) = pool.pair_children(tree)?;
    visit_tree(pool, left, lo, mid, f)?;
    visit_tree(pool, right, mid, hi, f)
}

fn replace_leaf(
    pool: &TermPool,
    tree: TermId,
    lo: usize,
    hi: usize,
    index: usize,
    value: TermId,
) -> Option<TermId> {
    if lo + 1 == hi {
        return Some(value);
    }
    let mid = (lo + hi) / 2;
    let (left, right) = pool.pair_children(tree)?;
    if index < mid {
        let left = replace_leaf(pool, left, lo, mid, index, value)?;
        Some(pool.pair(left, right))
    } else {
        let right = replace_leaf(pool, right, mid, hi, index, value)?;
        Some(pool.pair(left, right))
    }
}
