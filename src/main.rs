// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/
use push_pop_calculus::{Machine, MachineConfig, Operation, Result, State, Term, Var};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Program = Operation<&'static str, &'static str>;

fn main() {
    init_logging();

    println!("Push/Pop Calculus v0.1.0");
    println!("Set RUST_LOG=push_pop_calculus=trace to follow every step");
    println!();

    let machine = Machine::new(MachineConfig::default());

    for (title, program, input) in demos() {
        println!("=== {} ===", title);
        match build_state(&input).and_then(|state| {
            println!("program: {}", program);
            println!("input:   {}", state);
            machine.run(&program, state)
        }) {
            Err(e) => println!("Error: {}", e),
            Ok(result) if result.is_empty() => println!("output:  no successful outcome"),
            Ok(result) => println!("output:  {}", result),
        }
        println!();
    }
}

/// Reads `RUST_LOG`, defaulting to `warn`. Output goes to stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn build_state(stack: &[&'static str]) -> Result<State<&'static str, &'static str>> {
    State::new(["a", "b"]).with_values("a", stack.iter().copied())
}

fn demos() -> Vec<(&'static str, Program, Vec<&'static str>)> {
    let pops = |names: &[&str]| -> Vec<Program> { names.iter().map(|x| Operation::pop_var(*x, "a")).collect() };
    let pushes = |names: &[&str]| -> Vec<Program> { names.iter().map(|x| Operation::push_var(*x, "a")).collect() };

    // a<x>; a<y>; a<z>; [x]a; [z]a; [y]a
    let permute = Operation::sequence_of(pops(&["x", "y", "z"]).into_iter().chain(pushes(&["x", "z", "y"])));

    // a<x>; a<x>; [x]a
    let matching = Operation::sequence_of(pops(&["x", "x"]).into_iter().chain(pushes(&["x"])));

    // Move any number of cells from a onto b, then mark b
    let pick = Operation::seq(
        Operation::iterate(Operation::new_var(
            Var::new("x"),
            Operation::seq(Operation::pop_var("x", "a"), Operation::push_var("x", "b")),
        )),
        Operation::push(Term::constant("done"), "b"),
    );

    let either = Operation::branch(
        Operation::pop(Term::constant("c"), "a"),
        Operation::seq(Operation::pop_var("x", "a"), Operation::Fail),
    );

    vec![
        ("permutation", permute, vec!["e", "d", "c"]),
        ("consistent match", matching.clone(), vec!["c", "c"]),
        ("inconsistent match", matching, vec!["d", "c"]),
        ("iterated move", pick, vec!["e", "d", "c"]),
        ("branch", either, vec!["d", "c"]),
    ]
}
