// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/machine/iterate.rs
// Fixpoint closure for Iterate: the union over k >= 0 of k applications of
// the body

use super::{Configuration, Machine};
use crate::ast::*;
use crate::error::{MachineError, Result};
use std::time::Instant;
use tracing::debug;

/// Outcome of an `Iterate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixpoint<V: Carrier, L: Location> {
    pub configuration: Configuration<V, L>,
    /// Applications of the body, including the final one that produced
    /// nothing new
    pub rounds: usize,
}

impl Machine {
    /// Apply `body` to the newest states until an application yields none.
    ///
    /// Every path through the body is counted, so a state reachable in n
    /// different ways ends up with multiplicity n. A body that can cycle
    /// forever exceeds the configured bounds and reports divergence.
    pub fn fixpoint<V: Carrier, L: Location>(
        &self,
        body: &Operation<V, L>,
        start: Configuration<V, L>,
    ) -> Result<Fixpoint<V, L>> {
        self.fixpoint_in(body, start, &[])
    }

    pub(super) fn fixpoint_in<V: Carrier, L: Location>(
        &self,
        body: &Operation<V, L>,
        start: Configuration<V, L>,
        in_flight: &[Var],
    ) -> Result<Fixpoint<V, L>> {
        let started = Instant::now();
        let mut result = start.clone();
        let mut frontier = start;
        let mut rounds = 0;

        while !frontier.is_empty() {
            let elapsed = started.elapsed();
            let out_of_time = self.config.time_limit.is_some_and(|limit| elapsed >= limit);
            if rounds >= self.config.max_iterations || out_of_time {
                return Err(MachineError::Divergence { rounds, elapsed });
            }

            frontier = self.exec(body, frontier, in_flight)?;
            rounds += 1;
            debug!(round = rounds, states = frontier.len(), "iterate round");
            result = result.union(frontier.clone())?;
        }

        Ok(Fixpoint { configuration: result, rounds })
    }
}
