// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/machine/scope.rs
// NewVar: run a body with a fresh, scope-unique variable and project it out
// of the resulting states

use super::{Configuration, Machine};
use crate::ast::*;
use crate::core::memory::State;
use crate::core::multiset::Multiset;
use crate::error::Result;
use tracing::trace;

impl Machine {
    pub(super) fn new_var<V: Carrier, L: Location>(
        &self,
        x: &Var,
        body: &Operation<V, L>,
        state: State<V, L>,
        in_flight: &[Var],
    ) -> Result<Configuration<V, L>> {
        let fresh = fresh_for(x, body, &state, in_flight);
        trace!(var = %x, fresh = %fresh, "entering scope");
        let renamed = body.rename(x, &fresh);
        let mut scope = in_flight.to_vec();
        scope.push(fresh.clone());
        let out = self.exec(&renamed, Multiset::singleton(state), &scope)?;
        Multiset::from_counts(out.into_iter().map(|(s, m)| (project(s, &fresh), m)))
    }
}

/// The first local variable `x#i` that is not free in `body`, not used by
/// `state` and not reserved by an enclosing scope.
///
/// The choice depends only on its inputs, so scopes entered from equal
/// states pick equal names and their outcomes stay comparable.
pub fn fresh_for<V: Carrier, L: Location>(
    x: &Var,
    body: &Operation<V, L>,
    state: &State<V, L>,
    in_flight: &[Var],
) -> Var {
    let taken = body.free_vars();
    (0..)
        .map(|i| Var::indexed(&x.name, i))
        .find(|candidate| {
            !taken.contains(candidate)
                && !in_flight.contains(candidate)
                && !state.substitution.mentions(candidate)
                && !state.memory.mentions(candidate)
        })
        .unwrap_or_else(|| Var::indexed(&x.name, usize::MAX))
}

/// Existentially quantify `fresh` away: references to it are replaced by
/// its binding and the binding itself is removed.
pub fn project<V: Carrier, L: Location>(state: State<V, L>, fresh: &Var) -> State<V, L> {
    let memory = match state.substitution.get(fresh) {
        Some(binding) => state.memory.replace_refs(fresh, binding),
        None => state.memory,
    };
    State {
        memory,
        substitution: state.substitution.project_out(fresh),
    }
}
