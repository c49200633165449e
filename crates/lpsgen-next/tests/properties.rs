//! Property tests for the state codec and the generator protocol.

use lpsgen_data::{DataExpr, Op, Sort, TermId, TermPool, Variable};
use lpsgen_ir::{Assignment, LinearProcess, MultiAction, Specification, Summand};
use lpsgen_next::{
    NextState, NextStateConfig, NextStateGenerator, StateCodec, StateFormat, SubstitutionMode,
    Transition,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

/// `width` counters over 0..=max. Summand i increments counter i by a
/// summed step d in 1..=2; the last summand resets everything.
fn counters(width: usize, max: i64) -> Specification {
    let params: Vec<Variable> = (0..width)
        .map(|i| Variable::new(&format!("c{i}"), Sort::Range { lo: 0, hi: max }))
        .collect();
    let d = Variable::new("d", Sort::Range { lo: 1, hi: 2 });
    let mut summands: Vec<Summand> = params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let next = DataExpr::add(DataExpr::var(p), DataExpr::var(&d));
            Summand::new(
                DataExpr::app(Op::Le, vec![next.clone(), DataExpr::Int(max)]),
                MultiAction::single(&format!("inc{i}"), vec![DataExpr::var(&d)]),
                vec![Assignment::new(p, next)],
            )
            .with_summation(vec![d.clone()])
        })
        .collect();
    summands.push(Summand::new(
        DataExpr::Bool(true),
        MultiAction::tau(),
        params
            .iter()
            .map(|p| Assignment::new(p, DataExpr::Int(0)))
            .collect(),
    ));
    let initial = params
        .iter()
        .map(|p| Assignment::new(p, DataExpr::Int(0)))
        .collect();
    Specification::new(
        LinearProcess {
            parameters: params,
            summands,
        },
        initial,
    )
}

fn engine(width: usize, max: i64, format: StateFormat) -> NextState {
    NextState::with_reference_oracles(
        &counters(width, max),
        NextStateConfig::new(format, SubstitutionMode::Exact),
    )
    .unwrap()
}

fn edges(ts: Vec<Transition>, ns: &NextState) -> Vec<(String, Vec<DataExpr>)> {
    let mut out: Vec<(String, Vec<DataExpr>)> = ts
        .into_iter()
        .map(|t| (t.label(ns.pool()), ns.decode(t.target).unwrap()))
        .collect();
    out.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
    out
}

/// Breadth-first exploration; returns the number of reachable states.
fn explore(ns: &NextState) -> usize {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(ns.initial_state());
    queue.push_back(ns.initial_state());
    let mut g = ns.make_generator(ns.initial_state());
    while let Some(s) = queue.pop_front() {
        g.reset(s);
        for t in g.by_ref() {
            let t = t.unwrap();
            if seen.insert(t.target) {
                queue.push_back(t.target);
            }
        }
    }
    seen.len()
}

#[test]
fn test_reachable_states_agree_across_formats() {
    let vector = engine(3, 3, StateFormat::Vector);
    let tree = engine(3, 3, StateFormat::Tree);
    assert_eq!(explore(&vector), 64);
    assert_eq!(explore(&tree), 64);
}

#[test]
fn test_no_summation_variables_at_most_one_transition() {
    let ns = engine(4, 2, StateFormat::Tree);
    let reset = ns.summand_count() - 1;
    assert!(ns.table().get(reset).unwrap().summation_vars.is_empty());
    let mut g = ns.make_summand_generator(ns.initial_state(), reset).unwrap();
    assert!(g.next_transition().unwrap().is_some());
    assert!(g.next_transition().unwrap().is_none());
}

#[test]
fn test_prioritise_idempotent() {
    let mut ns = engine(3, 2, StateFormat::Vector);
    let moved = ns.prioritise("inc2");
    let order: Vec<usize> = ns.table().iter().map(|e| e.index).collect();
    let count = ns.num_prioritised();
    assert_eq!(moved, 1);
    assert_eq!(order, vec![2, 0, 1, 3]);

    assert_eq!(ns.prioritise("inc2"), 0);
    assert_eq!(ns.table().iter().map(|e| e.index).collect::<Vec<_>>(), order);
    assert_eq!(ns.num_prioritised(), count);

    let ts: Vec<Transition> = ns
        .make_generator(ns.initial_state())
        .collect::<Result<_, _>>()
        .unwrap();
    let flagged: Vec<usize> = ts.iter().filter(|t| t.prioritised).map(|t| t.summand).collect();
    assert_eq!(flagged, vec![2, 2]);
}

#[test]
fn test_tree_update_shares_off_path_subtrees() {
    let pool = TermPool::new();
    for n in [0usize, 1, 2, 3, 5, 8, 9] {
        let codec = StateCodec::new(StateFormat::Tree, n);
        let values: Vec<TermId> = (0..n as i64).map(|i| pool.int(i)).collect();
        let state = codec.encode(&pool, &values);
        assert_eq!(codec.update(&pool, state, &[]), Some(state));
        assert_eq!(codec.update(&pool, state, &[(n, pool.int(-1))]), None);
        for k in 0..n {
            let updated = codec.update(&pool, state, &[(k, pool.int(-1))]).unwrap();
            // Walk both trees along the path to k; the sibling at every level is shared.
            let (mut a, mut b) = (state.term(), updated.term());
            let (mut lo, mut hi) = (0, n);
            while lo + 1 != hi {
                let mid = (lo + hi) / 2;
                let (al, ar) = pool.pair_children(a).unwrap();
                let (bl, br) = pool.pair_children(b).unwrap();
                if k < mid {
                    assert_eq!(ar, br);
                    (a, b, hi) = (al, bl, mid);
                } else {
                    assert_eq!(al, bl);
                    (a, b, lo) = (ar, br, mid);
                }
            }
            assert_eq!(b, pool.int(-1));
            if n == 1 {
                assert_eq!(updated.term(), pool.int(-1));
            }
        }
    }
}

/// Drain two generators in the order given by `schedule` (true = first).
fn drain_interleaved(
    mut g1: NextStateGenerator<'_>,
    mut g2: NextStateGenerator<'_>,
    schedule: &[bool],
) -> (Vec<Transition>, Vec<Transition>) {
    let (mut out1, mut out2) = (Vec::new(), Vec::new());
    let (mut done1, mut done2) = (false, false);
    let mut turns = schedule.iter().copied().cycle();
    while !(done1 && done2) {
        let first = match turns.next() {
            Some(f) => (f && !done1) || done2,
            None => !done1,
        };
        if first {
            match g1.next_transition().unwrap() {
                Some(t) => out1.push(t),
                None => done1 = true,
            }
        } else {
            match g2.next_transition().unwrap() {
                Some(t) => out2.push(t),
                None => done2 = true,
            }
        }
    }
    (out1, out2)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn codec_decode_encode_decode(values in prop::collection::vec(-50i64..50, 0..20), tree in any::<bool>()) {
        let pool = TermPool::new();
        let format = if tree { StateFormat::Tree } else { StateFormat::Vector };
        let codec = StateCodec::new(format, values.len());
        let terms: Vec<TermId> = values.iter().map(|v| pool.int(*v)).collect();
        let state = codec.encode(&pool, &terms);
        let decoded = codec.decode(&pool, state).unwrap();
        prop_assert_eq!(&decoded, &terms);
        let again = codec.encode(&pool, &decoded);
        prop_assert_eq!(again, state);
        prop_assert_eq!(codec.decode(&pool, again).unwrap(), decoded);
    }

    #[test]
    fn interleaving_preserves_transitions(
        schedule in prop::collection::vec(any::<bool>(), 1..16),
        a in prop::collection::vec(0i64..=3, 3),
        b in prop::collection::vec(0i64..=3, 3),
        tree in any::<bool>(),
    ) {
        let format = if tree { StateFormat::Tree } else { StateFormat::Vector };
        let ns = engine(3, 3, format);
        let sa = ns.state_from_values(&a.iter().map(|v| DataExpr::Int(*v)).collect::<Vec<_>>()).unwrap();
        let sb = ns.state_from_values(&b.iter().map(|v| DataExpr::Int(*v)).collect::<Vec<_>>()).unwrap();

        let alone_a: Vec<Transition> = ns.make_generator(sa).collect::<Result<_, _>>().unwrap();
        let alone_b: Vec<Transition> = ns.make_generator(sb).collect::<Result<_, _>>().unwrap();

        let (mixed_a, mixed_b) =
            drain_interleaved(ns.make_generator(sa), ns.make_generator(sb), &schedule);
        prop_assert_eq!(edges(mixed_a, &ns), edges(alone_a, &ns));
        prop_assert_eq!(edges(mixed_b, &ns), edges(alone_b, &ns));
    }
}

#[test]
fn test_forked_engines_in_parallel() {
    use rayon::prelude::*;

    let ns = engine(3, 3, StateFormat::Tree);
    let init = ns.initial_state();
    let mut frontier = vec![init];
    let mut expected: HashMap<_, Vec<_>> = HashMap::new();
    let mut g = ns.make_generator(init);
    while let Some(s) = frontier.pop() {
        if expected.contains_key(&s) {
            continue;
        }
        g.reset(s);
        let targets: Vec<_> = g.by_ref().map(|t| t.unwrap().target).collect();
        frontier.extend(targets.iter().copied());
        expected.insert(s, targets);
    }
    drop(g);

    let states: Vec<_> = expected.keys().copied().collect();
    let forks: Vec<NextState> = (0..4).map(|_| ns.fork()).collect();
    let chunks: Vec<_> = states.chunks(states.len().div_ceil(4)).collect();
    let results: Vec<Vec<(_, Vec<_>)>> = forks
        .into_par_iter()
        .zip(chunks.into_par_iter())
        .map(|(fork, chunk)| {
            chunk
                .iter()
                .map(|s| {
                    let targets = fork
                        .make_generator(*s)
                        .map(|t| t.unwrap().target)
                        .collect::<Vec<_>>();
                    (*s, targets)
                })
                .collect()
        })
        .collect();

    let mut seen = 0;
    for (s, targets) in results.into_iter().flatten() {
        assert_eq!(expected[&s], targets);
        seen += 1;
    }
    assert_eq!(seen, states.len());
}
