// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/lib.rs
// Push/pop calculus library

pub mod ast;
pub mod core;
pub mod error;
pub mod machine;
pub mod syntax;

// Re-export commonly used items
pub use ast::{Carrier, Cell, Evaluator, FuncTerm, Location, Operation, OperationKind, Term, Var};
pub use crate::core::memory::{Memory, Stack, State};
pub use crate::core::multiset::Multiset;
pub use crate::core::subst::{Resolved, Substitution};
pub use crate::core::term::{evaluate_constant, evaluate_under, is_constant};
pub use error::{MachineError, Result};
pub use machine::{run, step, Configuration, Fixpoint, Machine, MachineConfig};
pub use syntax::{CONTINUE_GLYPH, FAIL_GLYPH};
