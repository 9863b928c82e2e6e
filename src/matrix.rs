// ==============================================================================
// matrix.rs - Symmetric Pairwise Matrix
// ==============================================================================
// Description: Square table indexed by pairs of interned keys (people or SNPs)
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Storage is a dense row-major Vec<T>. Matrices built with `symmetric_from_fn`
// compute the upper triangle (diagonal included) in parallel and mirror it, so
// cell (a, b) always equals cell (b, a).
// ==============================================================================

use rayon::prelude::*;
use std::collections::HashMap;

/// Ordered set of string keys with O(1) index lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

impl KeyIndex {
    /// Intern keys in order; repeated keys keep their first position
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let mut interned = KeyIndex::default();
        for key in keys {
            if !interned.index.contains_key(&key) {
                interned.index.insert(key.clone(), interned.keys.len());
                interned.keys.push(key);
            }
        }
        interned
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn key(&self, idx: usize) -> &str {
        &self.keys[idx]
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Square matrix over one key set
#[derive(Debug, Clone, PartialEq)]
pub struct PairMatrix<T> {
    keys: KeyIndex,
    values: Vec<T>,
}

/// Person × person difference counts
pub type DifferenceMatrix = PairMatrix<u64>;

/// SNP × SNP risk-allele co-occurrence counts
pub type CoOccurrenceMatrix = PairMatrix<u64>;

impl<T: Copy + Default> PairMatrix<T> {
    /// Matrix filled with `T::default()`
    pub fn new(keys: KeyIndex) -> Self {
        let n = keys.len();
        Self {
            keys,
            values: vec![T::default(); n * n],
        }
    }

    /// Set one cell, leaving its mirror untouched
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let n = self.keys.len();
        self.values[row * n + col] = value;
    }

    /// Set a cell and its mirror
    pub fn set_symmetric(&mut self, a: usize, b: usize, value: T) {
        self.set(a, b, value);
        self.set(b, a, value);
    }
}

impl<T: Copy + Default + Send + Sync> PairMatrix<T> {
    /// Build a symmetric matrix by evaluating `cell(i, j)` for every `i <= j`
    ///
    /// Rows are evaluated in parallel; results are collected per row and then
    /// written into the matrix on the calling thread.
    pub fn symmetric_from_fn<F>(keys: KeyIndex, cell: F) -> Self
    where
        F: Fn(usize, usize) -> T + Sync,
    {
        let n = keys.len();

        let upper_triangle: Vec<Vec<T>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| cell(i, j)).collect())
            .collect();

        let mut matrix = Self::new(keys);
        for (i, row) in upper_triangle.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                matrix.set_symmetric(i, i + offset, value);
            }
        }
        matrix
    }
}

impl<T: Copy> PairMatrix<T> {
    pub fn get(&self, row: usize, col: usize) -> T {
        self.values[row * self.keys.len() + col]
    }

    /// Cell lookup by key pair
    pub fn get_by_keys(&self, a: &str, b: &str) -> Option<T> {
        Some(self.get(self.keys.get(a)?, self.keys.get(b)?))
    }

    pub fn row(&self, row: usize) -> &[T] {
        let n = self.keys.len();
        &self.values[row * n..(row + 1) * n]
    }

    /// Rows in key order, each paired with its key
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[T])> {
        (0..self.keys.len()).map(move |i| (self.keys.key(i), self.row(i)))
    }

    /// Every cell as (row key, column key, value), row-major
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, T)> {
        let n = self.keys.len();
        (0..n).flat_map(move |i| {
            (0..n).map(move |j| (self.keys.key(i), self.keys.key(j), self.get(i, j)))
        })
    }

    pub fn keys(&self) -> &KeyIndex {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<T: Copy + PartialEq> PairMatrix<T> {
    pub fn is_symmetric(&self) -> bool {
        let n = self.keys.len();
        (0..n).all(|i| (i + 1..n).all(|j| self.get(i, j) == self.get(j, i)))
    }
}
