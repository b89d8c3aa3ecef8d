// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/machine/mod.rs
// The push/pop machine: executes an operation against every state of a
// configuration and collects the weighted outcomes

pub mod iterate;
pub mod scope;

pub use iterate::Fixpoint;

use crate::ast::*;
use crate::core::memory::State;
use crate::core::multiset::Multiset;
use crate::core::term::evaluate_under;
use crate::error::{MachineError, Result};
use rayon::prelude::*;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Weighted superposition of execution threads
pub type Configuration<V, L> = Multiset<State<V, L>>;

// ============================================================================
// Configuration
// ============================================================================

/// Limits and scheduling knobs for a machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Maximum number of body applications in one `Iterate`
    pub max_iterations: usize,
    /// Wall clock bound on one `Iterate`
    pub time_limit: Option<Duration>,
    /// Process states of a configuration on the rayon pool
    pub parallel: bool,
    /// Smallest configuration (distinct states) worth splitting
    pub parallel_threshold: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            max_iterations: 10_000,
            time_limit: None,
            parallel: true,
            parallel_threshold: 8,
        }
    }
}

impl MachineConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

// ============================================================================
// Machine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Machine {
    config: MachineConfig,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Machine { config }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Run `program` from a single initial state
    #[instrument(skip_all)]
    pub fn run<V: Carrier, L: Location>(
        &self,
        program: &Operation<V, L>,
        initial: State<V, L>,
    ) -> Result<Configuration<V, L>> {
        debug!(program = %program, "run");
        let result = self.step(program, Multiset::singleton(initial))?;
        debug!(states = result.len(), total = %result.total(), "run finished");
        Ok(result)
    }

    /// Apply `op` to every state of `config`. Each state contributes its
    /// outcomes scaled by its multiplicity.
    pub fn step<V: Carrier, L: Location>(
        &self,
        op: &Operation<V, L>,
        config: Configuration<V, L>,
    ) -> Result<Configuration<V, L>> {
        self.exec(op, config, &[])
    }

    /// `in_flight` holds the fresh names of the enclosing scopes
    fn exec<V: Carrier, L: Location>(
        &self,
        op: &Operation<V, L>,
        config: Configuration<V, L>,
        in_flight: &[Var],
    ) -> Result<Configuration<V, L>> {
        match op {
            Operation::Continue => Ok(config),
            Operation::Fail => Ok(Multiset::new()),
            Operation::Sequence(first, second) => {
                let middle = self.exec(first, config, in_flight)?;
                self.exec(second, middle, in_flight)
            }
            Operation::Iterate(body) => Ok(self.fixpoint_in(body, config, in_flight)?.configuration),
            _ => self.for_each_state(config, |state| self.exec_state(op, state, in_flight)),
        }
    }

    fn for_each_state<V, L, F>(&self, config: Configuration<V, L>, f: F) -> Result<Configuration<V, L>>
    where
        V: Carrier,
        L: Location,
        F: Fn(State<V, L>) -> Result<Configuration<V, L>> + Sync + Send,
    {
        if self.config.parallel && config.len() >= self.config.parallel_threshold {
            let entries: Vec<_> = config.into_iter().collect();
            entries
                .into_par_iter()
                .map(|(state, m)| f(state)?.scale(m))
                .try_reduce(Multiset::new, |a, b| a.union(b))
        } else {
            let mut acc = Multiset::new();
            for (state, m) in config {
                acc = acc.union(f(state)?.scale(m)?)?;
            }
            Ok(acc)
        }
    }

    fn exec_state<V: Carrier, L: Location>(
        &self,
        op: &Operation<V, L>,
        state: State<V, L>,
        in_flight: &[Var],
    ) -> Result<Configuration<V, L>> {
        trace!(op = %op, state = %state, "step");
        match op {
            Operation::Continue => Ok(Multiset::singleton(state)),
            Operation::Fail => Ok(Multiset::new()),
            Operation::Sequence(_, _) | Operation::Iterate(_) => {
                self.exec(op, Multiset::singleton(state), in_flight)
            }
            Operation::Branch(left, right) => self.branch(left, right, state, in_flight),
            Operation::Push(term, location) => discard_on_failure(push(term, location, state)),
            Operation::Pop(term, location) => discard_on_failure(pop(term, location, state)),
            Operation::NewVar(x, body) => self.new_var(x, body, state, in_flight),
        }
    }

    fn branch<V: Carrier, L: Location>(
        &self,
        left: &Operation<V, L>,
        right: &Operation<V, L>,
        state: State<V, L>,
        in_flight: &[Var],
    ) -> Result<Configuration<V, L>> {
        let left_start = Multiset::singleton(state.clone());
        let right_start = Multiset::singleton(state);
        let (left_out, right_out) = if self.config.parallel {
            rayon::join(
                || self.exec(left, left_start, in_flight),
                || self.exec(right, right_start, in_flight),
            )
        } else {
            (
                self.exec(left, left_start, in_flight),
                self.exec(right, right_start, in_flight),
            )
        };
        left_out?.union(right_out?)
    }
}

// ============================================================================
// Push and Pop
// ============================================================================

fn push<V: Carrier, L: Location>(
    term: &Term<V>,
    location: &L,
    state: State<V, L>,
) -> Result<Configuration<V, L>> {
    let cell = evaluate_under(term, &state.substitution)?;
    let memory = state.memory.push(location, cell)?;
    Ok(Multiset::singleton(State {
        memory,
        substitution: state.substitution,
    }))
}

fn pop<V: Carrier, L: Location>(
    term: &Term<V>,
    location: &L,
    state: State<V, L>,
) -> Result<Configuration<V, L>> {
    let (popped, memory) = state.memory.pop(location)?;
    let popped = state.substitution.resolve_cell(&popped)?;
    let substitution = match evaluate_under(term, &state.substitution)? {
        // An unbound variable cannot take its own reference as its value
        Cell::Ref(x) if popped.as_var() == Some(&x) => {
            return Err(MachineError::UnificationMismatch {
                popped: popped.to_string(),
                expected: x.to_string(),
            });
        }
        Cell::Ref(x) => state.substitution.bind(x, popped)?,
        Cell::Value(expected) => {
            if popped.as_value() != Some(&expected) {
                return Err(MachineError::UnificationMismatch {
                    popped: popped.to_string(),
                    expected: expected.to_string(),
                });
            }
            state.substitution
        }
    };
    Ok(Multiset::singleton(State { memory, substitution }))
}

/// Calculus failures drop the branch; every other error aborts the run
fn discard_on_failure<V: Carrier, L: Location>(
    result: Result<Configuration<V, L>>,
) -> Result<Configuration<V, L>> {
    match result {
        Err(e) if e.is_branch_failure() => {
            debug!(reason = %e, "branch discarded");
            Ok(Multiset::new())
        }
        other => other,
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Run `program` from `initial` with the default configuration
pub fn run<V: Carrier, L: Location>(
    program: &Operation<V, L>,
    initial: State<V, L>,
) -> Result<Configuration<V, L>> {
    Machine::default().run(program, initial)
}

/// Apply `op` to `config` with the default configuration
pub fn step<V: Carrier, L: Location>(
    op: &Operation<V, L>,
    config: Configuration<V, L>,
) -> Result<Configuration<V, L>> {
    Machine::default().step(op, config)
}
