// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/core/subst.rs
// Single-assignment substitution with chain resolution

use crate::ast::*;
use crate::error::{MachineError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Substitution
// ============================================================================

/// An immutable binding environment. Binding produces a new version; the
/// map is shared until one of the versions is changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Substitution<V> {
    bindings: Arc<BTreeMap<Var, Cell<V>>>,
}

/// Result of following a binding chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a, V> {
    Value(&'a V),
    Unbound(&'a Var),
}

impl<V> Default for Substitution<V> {
    fn default() -> Self {
        Substitution { bindings: Arc::new(BTreeMap::new()) }
    }
}

impl<V> Substitution<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, x: &Var) -> Option<&Cell<V>> {
        self.bindings.get(x)
    }

    pub fn contains(&self, x: &Var) -> bool {
        self.bindings.contains_key(x)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Cell<V>)> {
        self.bindings.iter()
    }

    /// Whether `x` is bound here or referenced by some binding
    pub fn mentions(&self, x: &Var) -> bool {
        self.contains(x) || self.bindings.values().any(|cell| cell.as_var() == Some(x))
    }

    /// Follow the chain of variable bindings starting at `x` until an
    /// unbound variable or a concrete value.
    pub fn resolve<'a>(&'a self, x: &'a Var) -> Result<Resolved<'a, V>> {
        let mut current = x;
        // A chain longer than the number of bindings must revisit a name
        for _ in 0..=self.bindings.len() {
            match self.bindings.get(current) {
                None => return Ok(Resolved::Unbound(current)),
                Some(Cell::Value(v)) => return Ok(Resolved::Value(v)),
                Some(Cell::Ref(next)) => current = next,
            }
        }
        Err(MachineError::CyclicBinding {
            var: x.name.clone(),
            target: current.name.clone(),
        })
    }
}

impl<V: Clone> Substitution<V> {
    /// Bind `x` to `cell`, failing if `x` already has a binding or if the
    /// binding would make `x` reachable from itself.
    pub fn bind(&self, x: Var, cell: Cell<V>) -> Result<Substitution<V>> {
        if self.contains(&x) {
            return Err(MachineError::AlreadyBound { var: x.name });
        }
        if let Cell::Ref(y) = &cell {
            if let Resolved::Unbound(end) = self.resolve(y)? {
                if *end == x {
                    return Err(MachineError::CyclicBinding {
                        var: x.name.clone(),
                        target: y.name.clone(),
                    });
                }
            }
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.bindings).insert(x, cell);
        Ok(next)
    }

    /// Resolve a cell: values are returned as is, references are followed
    /// to their end.
    pub fn resolve_cell(&self, cell: &Cell<V>) -> Result<Cell<V>> {
        match cell {
            Cell::Value(v) => Ok(Cell::Value(v.clone())),
            Cell::Ref(x) => Ok(match self.resolve(x)? {
                Resolved::Value(v) => Cell::Value(v.clone()),
                Resolved::Unbound(y) => Cell::Ref(y.clone()),
            }),
        }
    }

    /// Remove `x` from the environment. References to `x` held by other
    /// bindings are replaced by whatever `x` was bound to.
    pub fn project_out(&self, x: &Var) -> Substitution<V> {
        if !self.mentions(x) {
            return self.clone();
        }
        let mut next = self.clone();
        let map = Arc::make_mut(&mut next.bindings);
        if let Some(binding) = map.remove(x) {
            for cell in map.values_mut() {
                if cell.as_var() == Some(x) {
                    *cell = binding.clone();
                }
            }
        }
        next
    }
}

impl<V: Clone> FromIterator<(Var, Cell<V>)> for Substitution<V> {
    /// Builds a substitution without the single-assignment check; later
    /// entries for the same name win.
    fn from_iter<I: IntoIterator<Item = (Var, Cell<V>)>>(iter: I) -> Self {
        Substitution { bindings: Arc::new(iter.into_iter().collect()) }
    }
}
