// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/syntax/pretty.rs
// Diagnostic rendering of terms, operations, stacks and states

use crate::ast::*;
use crate::core::memory::{Memory, Stack, State};
use crate::core::multiset::Multiset;
use crate::core::subst::Substitution;
use std::fmt;
use std::hash::Hash;

pub const CONTINUE_GLYPH: &str = "★";
pub const FAIL_GLYPH: &str = "𝟎";

// ============================================================================
// Display Implementations
// ============================================================================

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<V: fmt::Display> fmt::Display for Cell<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Value(v) => write!(f, "{}", v),
            Cell::Ref(x) => write!(f, "{}", x),
        }
    }
}

impl<V> fmt::Display for Term<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Var(x) => write!(f, "{}", x),
            Term::Func(func) if func.arguments.is_empty() => write!(f, "{}", func.label),
            Term::Func(func) => {
                write!(f, "{}(", func.label)?;
                for (i, arg) in func.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl<V, L: fmt::Display> fmt::Display for Operation<V, L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Continue => write!(f, "{}", CONTINUE_GLYPH),
            Operation::Fail => write!(f, "{}", FAIL_GLYPH),
            Operation::Sequence(a, b) => write!(f, "({};{})", a, b),
            Operation::Branch(a, b) => write!(f, "({} + {})", a, b),
            Operation::Iterate(body) => write!(f, "({})*", body),
            Operation::Push(t, l) => write!(f, "[{}]{}", t, l),
            Operation::Pop(t, l) => write!(f, "{}<{}>", l, t),
            Operation::NewVar(x, body) => write!(f, "∃{}.({})", x, body),
        }
    }
}

/// Bottom to top, separated by spaces
impl<V: fmt::Display> fmt::Display for Stack<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut cells: Vec<_> = self.iter().collect();
        cells.reverse();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}

impl<V: fmt::Display, L: fmt::Display> fmt::Display for Memory<V, L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (location, stack)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}[{}]", location, stack)?;
        }
        Ok(())
    }
}

impl<V: fmt::Display> fmt::Display for Substitution<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (x, cell)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} ↦ {}", x, cell)?;
        }
        write!(f, "}}")
    }
}

impl<V: fmt::Display, L: fmt::Display> fmt::Display for State<V, L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.memory, self.substitution)
    }
}

/// Elements sorted by their rendering so output is stable
impl<T: fmt::Display + Eq + Hash> fmt::Display for Multiset<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut entries: Vec<(String, usize)> =
            self.iter().map(|(item, count)| (item.to_string(), *count)).collect();
        entries.sort();
        write!(f, "{{")?;
        for (i, (item, count)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if *count == 1 {
                write!(f, "{}", item)?;
            } else {
                write!(f, "{} ×{}", item, count)?;
            }
        }
        write!(f, "}}")
    }
}

// ============================================================================
// Utilities for debugging
// ============================================================================

impl<V, L: fmt::Display> Operation<V, L> {
    pub fn to_compact_string(&self) -> String {
        format!("{}", self)
    }

    /// One step per line; branch alternatives and scopes indented
    pub fn to_pretty_string(&self) -> String {
        format!("{}", PrettyPrinter::new(self, 0))
    }
}

struct PrettyPrinter<'a, V, L> {
    op: &'a Operation<V, L>,
    indent: usize,
}

impl<'a, V, L> PrettyPrinter<'a, V, L> {
    fn new(op: &'a Operation<V, L>, indent: usize) -> Self {
        PrettyPrinter { op, indent }
    }

    fn indent_str(&self) -> String {
        "  ".repeat(self.indent)
    }
}

impl<'a, V, L: fmt::Display> fmt::Display for PrettyPrinter<'a, V, L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op {
            Operation::Sequence(a, b) => {
                write!(f, "{}", PrettyPrinter::new(a, self.indent))?;
                writeln!(f, ";")?;
                write!(f, "{}{}", self.indent_str(), PrettyPrinter::new(b, self.indent))
            }

            // Both alternatives one level in, `+` at this level
            Operation::Branch(a, b) => {
                write!(f, "  {}", PrettyPrinter::new(a, self.indent + 1))?;
                writeln!(f)?;
                write!(f, "{}+", self.indent_str())?;
                writeln!(f)?;
                write!(f, "{}  {}", self.indent_str(), PrettyPrinter::new(b, self.indent + 1))
            }

            Operation::NewVar(x, body) => {
                write!(f, "∃{}.", x)?;
                writeln!(f)?;
                write!(f, "{}  {}", self.indent_str(), PrettyPrinter::new(body, self.indent + 1))
            }

            _ => write!(f, "{}", self.op),
        }
    }
}
