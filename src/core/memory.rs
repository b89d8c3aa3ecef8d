// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/core/memory.rs
// Persistent stacks, the per-thread memory of named stacks, and machine states

use crate::ast::*;
use crate::core::subst::Substitution;
use crate::error::{MachineError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Stack
// ============================================================================

struct Node<V> {
    cell: Cell<V>,
    next: Option<Arc<Node<V>>>,
}

/// A persistent stack of cells. Clones share structure; pushing or popping
/// one clone is never visible through another.
pub struct Stack<V> {
    head: Option<Arc<Node<V>>>,
    len: usize,
}

impl<V> Stack<V> {
    pub fn new() -> Self {
        Stack { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn push(&mut self, cell: Cell<V>) {
        let next = self.head.take();
        self.head = Some(Arc::new(Node { cell, next }));
        self.len += 1;
    }

    pub fn peek(&self) -> Option<&Cell<V>> {
        self.head.as_ref().map(|node| &node.cell)
    }

    /// Cells from top to bottom
    pub fn iter(&self) -> Iter<'_, V> {
        Iter { next: self.head.as_deref() }
    }

    /// Cells from bottom to top
    pub fn to_vec(&self) -> Vec<Cell<V>>
    where
        V: Clone,
    {
        let mut cells: Vec<_> = self.iter().cloned().collect();
        cells.reverse();
        cells
    }
}

impl<V: Clone> Stack<V> {
    /// Remove and return the top cell
    pub fn pop(&mut self) -> Option<Cell<V>> {
        let node = self.head.take()?;
        self.len -= 1;
        match Arc::try_unwrap(node) {
            Ok(node) => {
                self.head = node.next;
                Some(node.cell)
            }
            Err(shared) => {
                self.head = shared.next.clone();
                Some(shared.cell.clone())
            }
        }
    }

    /// Rebuild the stack with `f` applied to every cell
    pub fn map_cells(&self, mut f: impl FnMut(&Cell<V>) -> Cell<V>) -> Stack<V> {
        self.to_vec().iter().map(|cell| f(cell)).collect()
    }
}

pub struct Iter<'a, V> {
    next: Option<&'a Node<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a Cell<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.cell
        })
    }
}

impl<V> Default for Stack<V> {
    fn default() -> Self {
        Stack::new()
    }
}

impl<V> Clone for Stack<V> {
    fn clone(&self) -> Self {
        Stack { head: self.head.clone(), len: self.len }
    }
}

// Unlink iteratively so long stacks do not recurse on drop
impl<V> Drop for Stack<V> {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Bottom-to-top construction
impl<V> FromIterator<Cell<V>> for Stack<V> {
    fn from_iter<I: IntoIterator<Item = Cell<V>>>(iter: I) -> Self {
        let mut stack = Stack::new();
        for cell in iter {
            stack.push(cell);
        }
        stack
    }
}

impl<V: PartialEq> PartialEq for Stack<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for Stack<V> {}

impl<V: Hash> Hash for Stack<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        for cell in self.iter() {
            cell.hash(state);
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Stack<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut cells: Vec<_> = self.iter().collect();
        cells.reverse();
        f.debug_list().entries(cells).finish()
    }
}

// ============================================================================
// Memory
// ============================================================================

/// One stack per location of a fixed alphabet. Locations are created
/// together with the memory and never added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory<V, L> {
    stacks: BTreeMap<L, Stack<V>>,
}

impl<V, L> Memory<V, L> {
    pub fn locations(&self) -> impl Iterator<Item = &L> {
        self.stacks.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&L, &Stack<V>)> {
        self.stacks.iter()
    }
}

impl<V, L: Location> Memory<V, L> {
    /// Empty stacks for every location in `alphabet`
    pub fn new(alphabet: impl IntoIterator<Item = L>) -> Self {
        Memory {
            stacks: alphabet.into_iter().map(|l| (l, Stack::new())).collect(),
        }
    }

    pub fn stack(&self, location: &L) -> Result<&Stack<V>> {
        self.stacks.get(location).ok_or_else(|| unknown(location))
    }

    fn stack_mut(&mut self, location: &L) -> Result<&mut Stack<V>> {
        self.stacks.get_mut(location).ok_or_else(|| unknown(location))
    }
}

impl<V: Clone, L: Location> Memory<V, L> {
    /// Replace the stack at `location`, bottom to top
    pub fn with_stack(mut self, location: L, cells: impl IntoIterator<Item = Cell<V>>) -> Result<Self> {
        *self.stack_mut(&location)? = cells.into_iter().collect();
        Ok(self)
    }

    pub fn push(&self, location: &L, cell: Cell<V>) -> Result<Memory<V, L>> {
        let mut next = self.clone();
        next.stack_mut(location)?.push(cell);
        Ok(next)
    }

    pub fn pop(&self, location: &L) -> Result<(Cell<V>, Memory<V, L>)> {
        let mut next = self.clone();
        let cell = next
            .stack_mut(location)?
            .pop()
            .ok_or_else(|| MachineError::StackUnderflow { location: location.to_string() })?;
        Ok((cell, next))
    }

    pub fn peek(&self, location: &L) -> Result<Option<&Cell<V>>> {
        Ok(self.stack(location)?.peek())
    }

    /// Whether any cell refers to `x`
    pub fn mentions(&self, x: &Var) -> bool {
        self.stacks
            .values()
            .any(|stack| stack.iter().any(|cell| cell.as_var() == Some(x)))
    }

    /// Replace every reference to `x` by `replacement`
    pub fn replace_refs(&self, x: &Var, replacement: &Cell<V>) -> Memory<V, L> {
        let mut next = self.clone();
        for stack in next.stacks.values_mut() {
            if stack.iter().any(|cell| cell.as_var() == Some(x)) {
                *stack = stack.map_cells(|cell| match cell {
                    Cell::Ref(y) if y == x => replacement.clone(),
                    other => other.clone(),
                });
            }
        }
        next
    }
}

fn unknown<L: fmt::Display>(location: &L) -> MachineError {
    MachineError::UnknownLocation { location: location.to_string() }
}

// ============================================================================
// State
// ============================================================================

/// One execution thread: its memory and its substitution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State<V, L> {
    pub memory: Memory<V, L>,
    pub substitution: Substitution<V>,
}

impl<V, L: Location> State<V, L> {
    pub fn new(alphabet: impl IntoIterator<Item = L>) -> Self {
        State {
            memory: Memory::new(alphabet),
            substitution: Substitution::new(),
        }
    }

    pub fn from_memory(memory: Memory<V, L>) -> Self {
        State { memory, substitution: Substitution::new() }
    }
}

impl<V: Clone, L: Location> State<V, L> {
    /// Replace the stack at `location` with concrete values, bottom to top
    pub fn with_values(self, location: L, values: impl IntoIterator<Item = V>) -> Result<Self> {
        Ok(State {
            memory: self.memory.with_stack(location, values.into_iter().map(Cell::Value))?,
            substitution: self.substitution,
        })
    }

    /// Concrete values of the stack at `location`, bottom to top, with
    /// references resolved through the substitution
    pub fn values(&self, location: &L) -> Result<Vec<Cell<V>>> {
        self.memory
            .stack(location)?
            .to_vec()
            .iter()
            .map(|cell| self.substitution.resolve_cell(cell))
            .collect()
    }
}
