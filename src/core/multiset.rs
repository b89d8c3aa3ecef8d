// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/core/multiset.rs
// Weighted collections: elements mapped to positive multiplicities

use crate::error::{MachineError, Result};
use std::collections::hash_map::{self, HashMap};
use std::hash::Hash;

/// A multiset. Multiplicities are always at least 1; absent elements have
/// multiplicity 0 and are never stored. Arithmetic on multiplicities is
/// checked and reports `MultiplicityOverflow` instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiset<T: Eq + Hash> {
    counts: HashMap<T, usize>,
}

impl<T: Eq + Hash> Default for Multiset<T> {
    fn default() -> Self {
        Multiset { counts: HashMap::new() }
    }
}

impl<T: Eq + Hash> Multiset<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(item: T) -> Self {
        let mut m = Self::new();
        m.counts.insert(item, 1);
        m
    }

    /// Count duplicates of `items` by equality
    pub fn of(items: impl IntoIterator<Item = T>) -> Self {
        items.into_iter().collect()
    }

    /// Build from explicit `(element, multiplicity)` pairs
    pub fn from_counts(pairs: impl IntoIterator<Item = (T, usize)>) -> Result<Self> {
        let mut m = Self::new();
        for (item, count) in pairs {
            m.insert(item, count)?;
        }
        Ok(m)
    }

    /// Add `count` copies of `item`
    pub fn insert(&mut self, item: T, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let slot = self.counts.entry(item).or_insert(0);
        *slot = slot
            .checked_add(count)
            .ok_or(MachineError::MultiplicityOverflow)?;
        Ok(())
    }

    /// Multiplicity of `item`, 0 when absent
    pub fn get(&self, item: &T) -> usize {
        self.counts.get(item).copied().unwrap_or(0)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.counts.contains_key(item)
    }

    /// Number of distinct elements
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all multiplicities, widened so it cannot overflow
    pub fn total(&self) -> u128 {
        self.counts.values().map(|&count| count as u128).sum()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, T, usize> {
        self.counts.iter()
    }

    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.counts.keys()
    }

    /// Pointwise sum of multiplicities
    pub fn union(mut self, mut other: Self) -> Result<Self> {
        if self.counts.len() < other.counts.len() {
            std::mem::swap(&mut self, &mut other);
        }
        for (item, count) in other.counts {
            self.insert(item, count)?;
        }
        Ok(self)
    }

    /// Multiply every multiplicity by `k`. Scaling by 0 empties the set.
    pub fn scale(mut self, k: usize) -> Result<Self> {
        if k == 0 {
            self.counts.clear();
            return Ok(self);
        }
        for count in self.counts.values_mut() {
            *count = count.checked_mul(k).ok_or(MachineError::MultiplicityOverflow)?;
        }
        Ok(self)
    }
}

impl<T: Eq + Hash> FromIterator<T> for Multiset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut m = Self::new();
        for item in iter {
            // one per item
            let slot = m.counts.entry(item).or_insert(0);
            *slot = slot.saturating_add(1);
        }
        m
    }
}

impl<T: Eq + Hash> IntoIterator for Multiset<T> {
    type Item = (T, usize);
    type IntoIter = hash_map::IntoIter<T, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<'a, T: Eq + Hash> IntoIterator for &'a Multiset<T> {
    type Item = (&'a T, &'a usize);
    type IntoIter = hash_map::Iter<'a, T, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}
