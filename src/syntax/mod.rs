// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/syntax/mod.rs
// Rendering of programs and states

pub mod pretty;

pub use pretty::{CONTINUE_GLYPH, FAIL_GLYPH};
