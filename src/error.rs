// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/error.rs
// Error taxonomy for the push/pop machine

use std::time::Duration;
use thiserror::Error;

/// Errors raised while evaluating terms or executing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("function term {term} declares arity {expected} but has {actual} arguments")]
    ArityMismatch {
        term: String,
        expected: usize,
        actual: usize,
    },

    #[error("term {term} contains variable {var} and cannot be evaluated")]
    NonConstantTerm { term: String, var: String },

    #[error("variable {var} is already bound")]
    AlreadyBound { var: String },

    #[error("binding {var} to {target} would close a cycle")]
    CyclicBinding { var: String, target: String },

    #[error("location {location} is not part of this memory")]
    UnknownLocation { location: String },

    #[error("pop on empty stack at {location}")]
    StackUnderflow { location: String },

    #[error("popped {popped} does not match expected {expected}")]
    UnificationMismatch { popped: String, expected: String },

    #[error("state multiplicity overflowed")]
    MultiplicityOverflow,

    #[error("iterate did not converge after {rounds} rounds ({elapsed:?})")]
    Divergence { rounds: usize, elapsed: Duration },
}

impl MachineError {
    /// Failures intrinsic to the calculus. These discard the offending
    /// branch instead of aborting the run.
    pub fn is_branch_failure(&self) -> bool {
        matches!(
            self,
            MachineError::StackUnderflow { .. } | MachineError::UnificationMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MachineError>;
