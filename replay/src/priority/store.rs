use std::{cell::Cell, ops::Range};

use crate::error::{ArgumentErr, Result, check_priority};

/// The priority every example gets when a store is first created.
pub const DEFAULT_PRIORITY: f64 = 1.0;

/// Holds exactly one priority per train example.
///
/// The maximum is tracked incrementally so new examples can be seeded with it in constant time.
/// Lowering the example that holds it only marks it stale, the rescan happens on the next read.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityStore {
    priorities: Vec<f64>,
    /// `None` while stale.
    max: Cell<Option<f64>>,
}

impl PriorityStore {
    /// Creates a new `PriorityStore` with `n` examples at `DEFAULT_PRIORITY`.
    pub fn new(n: usize) -> Self {
        let mut store = Self {
            priorities: Vec::new(),
            max: Cell::new(Some(0.0)),
        };

        store.initialize(n);
        store
    }

    /// Discards every priority and sets `n` of them to `DEFAULT_PRIORITY`.
    pub fn initialize(&mut self, n: usize) {
        self.priorities = vec![DEFAULT_PRIORITY; n];
        self.max.set(Some(if n > 0 { DEFAULT_PRIORITY } else { 0.0 }));
    }

    /// Appends `n` examples seeded with the current maximum priority, so they get drawn early.
    /// An empty store seeds them with `DEFAULT_PRIORITY`.
    ///
    /// # Returns
    /// The index range assigned to the new examples.
    pub fn extend(&mut self, n: usize) -> Range<usize> {
        let start = self.priorities.len();
        let current = self.max_priority();
        let seed = if start == 0 {
            DEFAULT_PRIORITY
        } else {
            current
        };

        self.priorities.resize(start + n, seed);
        if n > 0 {
            self.max.set(Some(current.max(seed)));
        }

        start..self.priorities.len()
    }

    /// Sets the priority of a single example.
    ///
    /// # Returns
    /// An error if `index` is out of bounds or `priority` is negative or not finite.
    pub fn update(&mut self, index: usize, priority: f64) -> Result<()> {
        self.check(index, priority)?;
        self.set(index, priority);
        Ok(())
    }

    /// Sets the priorities of many examples at once.
    ///
    /// Every pair is validated before any of them is written, so a failed call leaves the store
    /// exactly as it was.
    pub fn update_many(&mut self, indices: &[usize], priorities: &[f64]) -> Result<()> {
        if indices.len() != priorities.len() {
            return Err(ArgumentErr::LengthMismatch {
                got: priorities.len(),
                expected: indices.len(),
            }
            .into());
        }

        for (&index, &priority) in indices.iter().zip(priorities) {
            self.check(index, priority)?;
        }

        for (&index, &priority) in indices.iter().zip(priorities) {
            self.set(index, priority);
        }

        Ok(())
    }

    /// Returns the largest stored priority, `0` for an empty store.
    ///
    /// Constant time unless the maximum was lowered since the last read.
    pub fn max_priority(&self) -> f64 {
        if let Some(max) = self.max.get() {
            return max;
        }

        let max = self.priorities.iter().copied().fold(0.0, f64::max);
        self.max.set(Some(max));
        max
    }

    /// Returns every priority, ordered by example index.
    #[inline]
    pub fn get_all(&self) -> &[f64] {
        &self.priorities
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.priorities.get(index).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    fn check(&self, index: usize, priority: f64) -> Result<()> {
        let len = self.priorities.len();
        if index >= len {
            return Err(ArgumentErr::IndexOutOfBounds { index, len }.into());
        }

        check_priority(index, priority)?;
        Ok(())
    }

    fn set(&mut self, index: usize, priority: f64) {
        let old = std::mem::replace(&mut self.priorities[index], priority);

        match self.max.get() {
            Some(max) if priority >= max => self.max.set(Some(priority)),
            Some(max) if old == max => self.max.set(None),
            _ => {}
        }
    }
}
