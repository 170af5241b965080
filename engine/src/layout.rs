use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Value of every node of a network, one bit per node (LSB-first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    bits: BitVec<u64, Lsb0>,
}

impl Configuration {
    pub fn zeros(n: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, n),
        }
    }

    pub fn from_bools<I: IntoIterator<Item = bool>>(values: I) -> Self {
        Self {
            bits: values.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, i: usize) -> bool {
        self.bits[i]
    }

    pub fn set(&mut self, i: usize, value: bool) {
        self.bits.set(i, value);
    }

    pub fn flip(&mut self, i: usize) {
        let v = self.bits[i];
        self.bits.set(i, !v);
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().by_vals()
    }

    /// Indices of nodes whose value is 1.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

/// Subset of the node ids `0..n`, bit-encoded so that it can key a hash set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSet {
    bits: BitVec<u64, Lsb0>,
}

impl NodeSet {
    pub fn empty(n: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, n),
        }
    }

    pub fn full(n: usize) -> Self {
        Self {
            bits: BitVec::repeat(true, n),
        }
    }

    pub fn from_indices<I: IntoIterator<Item = usize>>(n: usize, indices: I) -> Self {
        let mut set = Self::empty(n);
        for i in indices {
            set.insert(i);
        }
        set
    }

    /// Size of the node universe, not of the subset.
    pub fn universe(&self) -> usize {
        self.bits.len()
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn contains(&self, i: usize) -> bool {
        self.bits[i]
    }

    pub fn insert(&mut self, i: usize) {
        self.bits.set(i, true);
    }

    pub fn remove(&mut self, i: usize) {
        self.bits.set(i, false);
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    pub fn union_with(&mut self, other: &NodeSet) {
        for i in other.iter() {
            self.insert(i);
        }
    }

    pub fn difference_with(&mut self, other: &NodeSet) {
        for i in other.iter() {
            self.remove(i);
        }
    }

    pub fn difference(&self, other: &NodeSet) -> NodeSet {
        let mut out = self.clone();
        out.difference_with(other);
        out
    }

    pub fn is_subset(&self, other: &NodeSet) -> bool {
        self.iter().all(|i| other.contains(i))
    }

    pub fn is_disjoint(&self, other: &NodeSet) -> bool {
        self.iter().all(|i| !other.contains(i))
    }
}
