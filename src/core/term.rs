// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/core/term.rs
// Constant detection and bottom-up evaluation of function terms

use crate::ast::*;
use crate::core::subst::{Resolved, Substitution};
use crate::error::{MachineError, Result};

/// A term is constant iff no variable occurs anywhere in its tree
pub fn is_constant<V>(term: &Term<V>) -> bool {
    match term {
        Term::Var(_) => false,
        Term::Func(func) => func.arguments.iter().all(is_constant),
    }
}

/// Evaluate a constant term post-order, applying each node's rule to its
/// already computed arguments.
pub fn evaluate_constant<V: Clone>(term: &Term<V>) -> Result<V> {
    match term {
        Term::Var(x) => Err(MachineError::NonConstantTerm {
            term: term.to_string(),
            var: x.name.clone(),
        }),
        Term::Func(func) => {
            check_arity(term, func)?;
            let args = func
                .arguments
                .iter()
                .map(evaluate_constant)
                .collect::<Result<Vec<V>>>()?;
            Ok((func.evaluate)(&args))
        }
    }
}

/// Resolve `term` against a substitution.
///
/// A variable resolves along its binding chain to a value or to the
/// unbound variable at the end of the chain. A function term must have all
/// of its variables bound to values, otherwise it is not constant.
pub fn evaluate_under<V: Clone>(term: &Term<V>, subst: &Substitution<V>) -> Result<Cell<V>> {
    match term {
        Term::Var(x) => Ok(match subst.resolve(x)? {
            Resolved::Value(v) => Cell::Value(v.clone()),
            Resolved::Unbound(y) => Cell::Ref(y.clone()),
        }),
        Term::Func(func) => {
            check_arity(term, func)?;
            let mut args = Vec::with_capacity(func.arguments.len());
            for arg in &func.arguments {
                match evaluate_under(arg, subst)? {
                    Cell::Value(v) => args.push(v),
                    Cell::Ref(y) => {
                        return Err(MachineError::NonConstantTerm {
                            term: term.to_string(),
                            var: y.name,
                        })
                    }
                }
            }
            Ok(Cell::Value((func.evaluate)(&args)))
        }
    }
}

fn check_arity<V>(term: &Term<V>, func: &FuncTerm<V>) -> Result<()> {
    if func.arguments.len() != func.arity {
        return Err(MachineError::ArityMismatch {
            term: term.to_string(),
            expected: func.arity,
            actual: func.arguments.len(),
        });
    }
    Ok(())
}
