// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// tests/machine_test.rs
// Tests the semantics of every operation

use push_pop_calculus::*;
use std::time::Duration;

type S = State<&'static str, &'static str>;
type Op = Operation<&'static str, &'static str>;
type Config = Configuration<&'static str, &'static str>;

fn state(l1: &[&'static str]) -> S {
    State::new(["L1", "L2"]).with_values("L1", l1.iter().copied()).unwrap()
}

fn with_l2(s: S, l2: &[&'static str]) -> S {
    s.with_values("L2", l2.iter().copied()).unwrap()
}

fn only(config: &Config) -> &S {
    assert_eq!(config.len(), 1, "expected a single state, got {}", config);
    config.elements().next().unwrap()
}

fn cells(s: &S, location: &'static str) -> Vec<Cell<&'static str>> {
    s.memory.stack(&location).unwrap().to_vec()
}

fn vals(xs: &[&'static str]) -> Vec<Cell<&'static str>> {
    xs.iter().map(|x| Cell::Value(*x)).collect()
}

fn lit(v: &'static str) -> Term<&'static str> {
    Term::constant(v)
}

fn sequential() -> Machine {
    Machine::new(MachineConfig::default().with_parallel(false))
}

#[test]
fn test_machine_keeps_its_config() {
    let config = MachineConfig::default()
        .with_max_iterations(7)
        .with_time_limit(Duration::from_secs(1))
        .with_parallel(false)
        .with_parallel_threshold(3);
    let machine = Machine::new(config.clone());

    assert_eq!(machine.config(), &config);
    assert_eq!(machine.config().max_iterations, 7);
    assert_eq!(Machine::default().config(), &MachineConfig::default());
}

// ============================================================================
// Continue / Fail / Sequence / Branch
// ============================================================================

#[test]
fn test_continue_is_identity() {
    let s = state(&["e", "d"]);
    let result = run(&Op::Continue, s.clone()).unwrap();
    assert_eq!(result, Multiset::singleton(s));
}

#[test]
fn test_fail_is_empty() {
    let result = run(&Op::Fail, state(&["e"])).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_fail_absorbs_sequence() {
    let program = Op::seq(Op::Fail, Op::push(lit("c"), "L1"));
    assert!(run(&program, state(&[])).unwrap().is_empty());
}

#[test]
fn test_sequence_composes() {
    let a = Op::pop_var("x", "L1");
    let b = Op::push_var("x", "L2");
    let s = state(&["d", "c"]);

    let whole = run(&Op::seq(a.clone(), b.clone()), s.clone()).unwrap();
    let staged = step(&b, step(&a, Multiset::singleton(s)).unwrap()).unwrap();
    assert_eq!(whole, staged);

    let out = only(&whole);
    assert_eq!(cells(out, "L1"), vals(&["d"]));
    assert_eq!(cells(out, "L2"), vals(&["c"]));
}

#[test]
fn test_branch_runs_both_sides_from_same_state() {
    let program = Op::branch(Op::pop_var("x", "L1"), Op::push(lit("z"), "L1"));
    let result = run(&program, state(&["c"])).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.total(), 2);
    let popped = result.elements().find(|s| s.memory.stack(&"L1").unwrap().is_empty()).unwrap();
    assert_eq!(popped.substitution.get(&Var::new("x")), Some(&Cell::Value("c")));
    let pushed = result.elements().find(|s| s.memory.stack(&"L1").unwrap().len() == 2).unwrap();
    assert!(pushed.substitution.is_empty());
}

#[test]
fn test_branch_accumulates_equal_outcomes() {
    let s = state(&[]);
    let program = Op::branch(Op::push(lit("c"), "L1"), Op::push(lit("c"), "L1"));
    let result = run(&program, s).unwrap();

    let expected = state(&["c"]);
    assert_eq!(result.len(), 1);
    assert_eq!(result.get(&expected), 2);
}

#[test]
fn test_branch_with_failing_side() {
    let program = Op::branch(Op::Fail, Op::Continue);
    let s = state(&["c"]);
    assert_eq!(run(&program, s.clone()).unwrap(), Multiset::singleton(s));
}

#[test]
fn test_multiplicities_multiply_through_sequence() {
    let twice = Op::branch(Op::Continue, Op::Continue);
    let program = Op::seq(twice.clone(), twice);
    let s = state(&[]);
    let result = run(&program, s.clone()).unwrap();
    assert_eq!(result.get(&s), 4);
}

// ============================================================================
// Push
// ============================================================================

#[test]
fn test_push_constant() {
    let result = run(&Op::push(lit("c"), "L1"), state(&["e"])).unwrap();
    assert_eq!(cells(only(&result), "L1"), vals(&["e", "c"]));
}

#[test]
fn test_push_unbound_variable_pushes_reference() {
    let result = run(&Op::push_var("x", "L1"), state(&[])).unwrap();
    assert_eq!(cells(only(&result), "L1"), vec![Cell::Ref(Var::new("x"))]);
}

#[test]
fn test_push_bound_variable_pushes_value() {
    let program = Op::seq(Op::pop_var("x", "L1"), Op::push_var("x", "L2"));
    let result = run(&program, state(&["c"])).unwrap();
    assert_eq!(cells(only(&result), "L2"), vals(&["c"]));
}

#[test]
fn test_push_function_of_bound_variables() {
    let program: Operation<i64, &str> = Operation::seq(
        Operation::pop_var("x", "L1"),
        Operation::push(
            Term::apply("inc", vec![Term::var("x")], |xs: &[i64]| xs[0] + 1),
            "L1",
        ),
    );
    let s = State::new(["L1"]).with_values("L1", [41]).unwrap();
    let result = run(&program, s).unwrap();
    let out = result.elements().next().unwrap();
    assert_eq!(out.memory.stack(&"L1").unwrap().to_vec(), vec![Cell::Value(42)]);
}

#[test]
fn test_push_arity_mismatch_aborts_run() {
    let bad: Term<&str> = Term::func("f", 2, vec![lit("a")], |xs: &[&'static str]| xs[0]);
    let program = Op::branch(Op::Continue, Op::push(bad, "L1"));
    assert!(matches!(
        run(&program, state(&[])),
        Err(MachineError::ArityMismatch { expected: 2, actual: 1, .. })
    ));
}

#[test]
fn test_push_non_constant_function_aborts_run() {
    let f: Term<&str> = Term::apply("id", vec![Term::var("x")], |xs: &[&'static str]| xs[0]);
    assert!(matches!(
        run(&Op::push(f, "L1"), state(&[])),
        Err(MachineError::NonConstantTerm { .. })
    ));
}

#[test]
fn test_unknown_location_aborts_run() {
    assert_eq!(
        run(&Op::push(lit("c"), "L9"), state(&[])),
        Err(MachineError::UnknownLocation { location: "L9".to_string() })
    );
}

// ============================================================================
// Pop
// ============================================================================

#[test]
fn test_push_pop_round_trip() {
    let program = Op::seq(Op::push(lit("x"), "L1"), Op::pop_var("varX", "L1"));
    let result = run(&program, state(&[])).unwrap();
    let out = only(&result);
    assert_eq!(out.substitution.get(&Var::new("varX")), Some(&Cell::Value("x")));
    assert!(out.memory.stack(&"L1").unwrap().is_empty());
}

#[test]
fn test_pop_underflow_discards_branch() {
    let result = run(&Op::pop_var("x", "L1"), state(&[])).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_pop_underflow_keeps_sibling_branch() {
    let program = Op::branch(Op::pop_var("x", "L1"), Op::push(lit("c"), "L1"));
    let result = run(&program, state(&[])).unwrap();
    assert_eq!(result, Multiset::singleton(state(&["c"])));
}

#[test]
fn test_pop_constant_match() {
    let result = run(&Op::pop(lit("c"), "L1"), state(&["d", "c"])).unwrap();
    let out = only(&result);
    assert_eq!(cells(out, "L1"), vals(&["d"]));
    assert!(out.substitution.is_empty());
}

#[test]
fn test_pop_constant_mismatch_discards() {
    let result = run(&Op::pop(lit("d"), "L1"), state(&["d", "c"])).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_pop_bound_variable_must_match() {
    let program = Op::seq(Op::pop_var("x", "L1"), Op::pop_var("x", "L2"));
    let matching = with_l2(state(&["c"]), &["c"]);
    let clashing = with_l2(state(&["c"]), &["d"]);

    assert_eq!(run(&program, matching).unwrap().total(), 1);
    assert!(run(&program, clashing).unwrap().is_empty());
}

#[test]
fn test_pop_binds_deferred_reference() {
    // [x]L1; L1<y> leaves y ↦ x; L2<x> then fixes x and therefore y
    let program = Op::sequence_of([
        Op::push_var("x", "L1"),
        Op::pop_var("y", "L1"),
        Op::pop_var("x", "L2"),
    ]);
    let result = run(&program, with_l2(state(&[]), &["c"])).unwrap();
    let out = only(&result);

    let y = Var::new("y");
    assert_eq!(out.substitution.get(&y), Some(&Cell::Ref(Var::new("x"))));
    assert_eq!(out.substitution.resolve(&y), Ok(Resolved::Value(&"c")));
}

#[test]
fn test_pop_own_reference_discards() {
    // x is unbound, so [x]L1 pushes a reference to x itself
    let program = Op::seq(Op::push_var("x", "L1"), Op::pop_var("x", "L1"));
    assert!(run(&program, state(&[])).unwrap().is_empty());
}

#[test]
fn test_pop_own_reference_through_chain_discards() {
    // y ↦ x, so the popped y resolves to the unbound x
    let program = Op::sequence_of([
        Op::push_var("x", "L1"),
        Op::pop_var("y", "L1"),
        Op::push_var("y", "L1"),
        Op::pop_var("x", "L1"),
    ]);
    assert!(run(&program, state(&[])).unwrap().is_empty());
}

#[test]
fn test_pop_reference_against_bound_value_discards() {
    // x is bound to c; the popped cell is the still symbolic y
    let program = Op::sequence_of([
        Op::pop_var("x", "L2"),
        Op::push_var("y", "L1"),
        Op::pop_var("x", "L1"),
    ]);
    let result = run(&program, with_l2(state(&[]), &["c"])).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_pop_function_term_compares_value() {
    let program: Operation<i64, &str> = Operation::seq(
        Operation::pop_var("x", "L1"),
        Operation::pop(
            Term::apply("double", vec![Term::var("x")], |xs: &[i64]| xs[0] * 2),
            "L1",
        ),
    );
    let good = State::new(["L1"]).with_values("L1", [6, 3]).unwrap();
    let bad = State::new(["L1"]).with_values("L1", [7, 3]).unwrap();
    assert_eq!(run(&program, good).unwrap().total(), 1);
    assert!(run(&program, bad).unwrap().is_empty());
}

// ============================================================================
// NewVar
// ============================================================================

#[test]
fn test_new_var_projects_fresh_binding() {
    let program = Op::new_var(
        Var::new("x"),
        Op::seq(Op::pop_var("x", "L1"), Op::push_var("x", "L2")),
    );
    let result = run(&program, state(&["c"])).unwrap();
    let out = only(&result);

    assert!(out.memory.stack(&"L1").unwrap().is_empty());
    assert_eq!(cells(out, "L2"), vals(&["c"]));
    assert!(out.substitution.is_empty());
}

#[test]
fn test_new_var_does_not_clash_with_outer_binding() {
    // Outer x = c; the scoped x is a different variable and may pop d
    let program = Op::sequence_of([
        Op::pop_var("x", "L1"),
        Op::new_var(
            Var::new("x"),
            Op::seq(Op::pop_var("x", "L1"), Op::push_var("x", "L2")),
        ),
    ]);
    let result = run(&program, state(&["d", "c"])).unwrap();
    let out = only(&result);

    assert_eq!(cells(out, "L2"), vals(&["d"]));
    assert_eq!(out.substitution.len(), 1);
    assert_eq!(out.substitution.get(&Var::new("x")), Some(&Cell::Value("c")));
}

#[test]
fn test_new_var_unbound_leaves_local_reference() {
    let program = Op::new_var(Var::new("x"), Op::push_var("x", "L1"));
    let result = run(&program, state(&[])).unwrap();
    let out = only(&result);

    match cells(out, "L1").as_slice() {
        [Cell::Ref(v)] => {
            assert!(v.local);
            assert!(v.name.starts_with("x#"));
        }
        other => panic!("Expected one reference, got {:?}", other),
    }
}

#[test]
fn test_new_var_replaces_references_on_exit() {
    // The fresh variable is pushed symbolically, then bound by a later pop
    let program = Op::new_var(
        Var::new("x"),
        Op::seq(Op::push_var("x", "L1"), Op::pop_var("x", "L2")),
    );
    let result = run(&program, with_l2(state(&[]), &["c"])).unwrap();
    let out = only(&result);

    assert_eq!(cells(out, "L1"), vals(&["c"]));
    assert!(out.substitution.is_empty());
}

#[test]
fn test_sibling_scopes_get_distinct_names() {
    let scoped_push = Op::new_var(Var::new("x"), Op::push_var("x", "L1"));
    let program = Op::seq(scoped_push.clone(), scoped_push);
    let result = run(&program, state(&[])).unwrap();
    let out = only(&result);

    match cells(out, "L1").as_slice() {
        [Cell::Ref(a), Cell::Ref(b)] => assert_ne!(a, b),
        other => panic!("Expected two references, got {:?}", other),
    }
}

#[test]
fn test_equal_scopes_in_branches_merge() {
    let scoped_push = Op::new_var(Var::new("x"), Op::push_var("x", "L1"));
    let program = Op::branch(scoped_push.clone(), scoped_push);
    let result = run(&program, state(&[])).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.total(), 2);
}

#[test]
fn test_nested_scope_shadows() {
    // ∃x.(L1<x>; ∃x.(L1<x>); [x]L2): the outer x survives the inner scope
    let program = Op::new_var(
        Var::new("x"),
        Op::sequence_of([
            Op::pop_var("x", "L1"),
            Op::new_var(Var::new("x"), Op::pop_var("x", "L1")),
            Op::push_var("x", "L2"),
        ]),
    );
    let result = run(&program, state(&["d", "c"])).unwrap();
    let out = only(&result);
    assert_eq!(cells(out, "L2"), vals(&["c"]));
    assert!(out.substitution.is_empty());
}

// ============================================================================
// Iterate
// ============================================================================

#[test]
fn test_iterate_collects_every_prefix() {
    let program = Op::iterate(Op::new_var(
        Var::new("x"),
        Op::seq(Op::pop_var("x", "L1"), Op::push_var("x", "L2")),
    ));
    let result = run(&program, state(&["e", "d", "c"])).unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(result.total(), 4);
    let moved = with_l2(state(&[]), &["c", "d", "e"]);
    assert_eq!(result.get(&moved), 1);
    assert_eq!(result.get(&state(&["e", "d", "c"])), 1);
}

#[test]
fn test_iterate_of_fail_is_identity() {
    let s = state(&["c"]);
    let result = run(&Op::iterate(Op::Fail), s.clone()).unwrap();
    assert_eq!(result, Multiset::singleton(s));
}

#[test]
fn test_iterate_rounds_bound_by_depth() {
    let machine = sequential();
    let body = Op::pop_var("x", "L1");
    let fix = machine
        .fixpoint(&body, Multiset::singleton(state(&["c", "c", "c"])))
        .unwrap();

    assert_eq!(fix.rounds, 4);
    assert_eq!(fix.configuration.len(), 4);
}

#[test]
fn test_iterate_stops_at_first_mismatch() {
    let machine = sequential();
    let body = Op::pop_var("x", "L1");
    let fix = machine
        .fixpoint(&body, Multiset::singleton(state(&["e", "d", "c"])))
        .unwrap();

    // c binds x, then d ≠ c
    assert_eq!(fix.rounds, 2);
    assert_eq!(fix.configuration.total(), 2);
}

#[test]
fn test_iterate_counts_paths() {
    let body = Op::branch(Op::pop(lit("c"), "L1"), Op::pop(lit("c"), "L1"));
    let result = run(&Op::iterate(body), state(&["c"])).unwrap();

    assert_eq!(result.get(&state(&["c"])), 1);
    assert_eq!(result.get(&state(&[])), 2);
}

#[test]
fn test_iterate_within_exact_bound() {
    let machine = Machine::new(MachineConfig::default().with_max_iterations(4));
    let program = Op::iterate(Op::pop_var("x", "L1"));
    assert!(machine.run(&program, state(&["c", "c", "c"])).is_ok());
}

#[test]
fn test_iterate_divergence_on_round_bound() {
    let machine = Machine::new(MachineConfig::default().with_max_iterations(3));
    let program = Op::iterate(Op::pop_var("x", "L1"));
    assert!(matches!(
        machine.run(&program, state(&["c", "c", "c"])),
        Err(MachineError::Divergence { rounds: 3, .. })
    ));
}

#[test]
fn test_iterate_non_terminating_body_diverges() {
    let machine = Machine::new(MachineConfig::default().with_max_iterations(50));
    let program = Op::iterate(Op::push(lit("c"), "L1"));
    assert!(matches!(
        machine.run(&program, state(&[])),
        Err(MachineError::Divergence { rounds: 50, .. })
    ));
}

#[test]
fn test_iterate_time_limit() {
    let machine = Machine::new(MachineConfig::default().with_time_limit(Duration::ZERO));
    let program = Op::iterate(Op::Continue);
    assert!(matches!(
        machine.run(&program, state(&[])),
        Err(MachineError::Divergence { rounds: 0, .. })
    ));
}

// ============================================================================
// Multiplicities
// ============================================================================

fn doubling(k: usize) -> Op {
    Op::sequence_of((0..k).map(|_| Op::branch(Op::Continue, Op::Continue)))
}

#[test]
fn test_branch_chain_counts_paths_up_to_limit() {
    let k = usize::BITS as usize - 1;
    let s = state(&["c"]);
    let result = sequential().run(&doubling(k), s.clone()).unwrap();
    assert_eq!(result.get(&s), 1usize << k);
}

#[test]
fn test_branch_chain_overflow_is_an_error() {
    let k = usize::BITS as usize;
    for machine in [sequential(), Machine::default()] {
        assert_eq!(
            machine.run(&doubling(k), state(&["c"])),
            Err(MachineError::MultiplicityOverflow)
        );
    }
}

#[test]
fn test_iterate_over_two_way_body_doubles_each_round() {
    let depth = 20;
    let body = Op::branch(Op::pop_var("x", "L1"), Op::pop_var("x", "L1"));
    let result = sequential()
        .run(&Op::iterate(body), state(&vec!["c"; depth]))
        .unwrap();

    assert_eq!(result.len(), depth + 1);
    assert_eq!(result.get(&state(&vec!["c"; depth])), 1);
    for popped in 1..=depth {
        let mut expected = state(&vec!["c"; depth - popped]);
        expected.substitution = expected
            .substitution
            .bind(Var::new("x"), Cell::Value("c"))
            .unwrap();
        assert_eq!(result.get(&expected), 1 << popped, "after {} pops", popped);
    }
}

#[test]
fn test_parallel_fold_reports_overflow() {
    // Eight distinct states, each already carrying 2^(BITS - 1) paths
    let fan_out = Op::branch(Op::push(lit("a"), "L1"), Op::push(lit("b"), "L1"));
    let program = Op::sequence_of([
        fan_out.clone(),
        fan_out.clone(),
        fan_out,
        doubling(usize::BITS as usize - 1),
        Op::branch(Op::Continue, Op::Continue),
    ]);
    let parallel = Machine::new(MachineConfig::default().with_parallel_threshold(2));
    assert_eq!(
        parallel.run(&program, state(&[])),
        Err(MachineError::MultiplicityOverflow)
    );
}

// ============================================================================
// Parallel evaluation
// ============================================================================

#[test]
fn test_parallel_matches_sequential() {
    let fan_out = Op::branch(Op::push(lit("a"), "L1"), Op::push(lit("b"), "L1"));
    let program = Op::sequence_of([
        fan_out.clone(),
        fan_out.clone(),
        fan_out.clone(),
        fan_out.clone(),
        Op::branch(Op::Continue, Op::pop(lit("a"), "L1")),
        Op::iterate(Op::new_var(
            Var::new("x"),
            Op::seq(Op::pop_var("x", "L1"), Op::push_var("x", "L2")),
        )),
    ]);

    let parallel = Machine::new(
        MachineConfig::default()
            .with_parallel(true)
            .with_parallel_threshold(2),
    );
    let s = state(&[]);
    let expected = sequential().run(&program, s.clone()).unwrap();
    let actual = parallel.run(&program, s).unwrap();

    assert_eq!(actual, expected);
    assert!(expected.len() > 16);
}
