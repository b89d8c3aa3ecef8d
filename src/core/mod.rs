// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/core/mod.rs
// Terms, substitutions, stacks and multisets

pub mod memory;
pub mod multiset;
pub mod subst;
pub mod term;
