//! Lean incremental Merkle tree
//!
//! Append-only tree over commitment hashes. The depth is the minimum that
//! holds the current leaves (`ceil(log2(n))`), and a left node without a
//! right sibling is carried up unchanged instead of being hashed with a
//! padding value. The empty tree has root zero.

use std::collections::HashMap;

use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use crate::crypto::{Field, PoseidonHasher};
use crate::error::{PoolError, PoolResult};
use crate::merkle::proof::MembershipProof;

/// Largest supported tree depth
pub const MAX_SUPPORTED_DEPTH: usize = 32;

/// Append-only accumulator of commitment hashes
#[derive(Debug, Clone)]
pub struct Accumulator {
    max_depth: usize,
    /// `levels[0]` holds the leaves, the last level holds the root
    levels: Vec<Vec<Field>>,
    positions: HashMap<Field, u64>,
}

impl Accumulator {
    /// Create an empty accumulator bounded by `max_depth`
    pub fn new(max_depth: usize) -> PoolResult<Self> {
        if max_depth == 0 || max_depth > MAX_SUPPORTED_DEPTH {
            return Err(PoolError::InvalidInput(format!(
                "max depth must be in 1..={}, got {}",
                MAX_SUPPORTED_DEPTH, max_depth
            )));
        }

        Ok(Self {
            max_depth,
            levels: vec![Vec::new()],
            positions: HashMap::new(),
        })
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Maximum number of leaves
    pub fn capacity(&self) -> u64 {
        1u64 << self.max_depth
    }

    pub fn leaf_count(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Current height
    pub fn depth(&self) -> usize {
        ceil_log2(self.leaf_count())
    }

    pub fn root(&self) -> Field {
        match self.levels.get(self.depth()) {
            Some(level) => level.first().copied().unwrap_or_else(Field::zero),
            None => Field::zero(),
        }
    }

    /// Position of the first leaf equal to `leaf`
    pub fn index_of(&self, leaf: &Field) -> Option<u64> {
        self.positions.get(leaf).copied()
    }

    pub fn leaves(&self) -> &[Field] {
        &self.levels[0]
    }

    /// Append a leaf and return its permanent index
    pub fn insert(&mut self, leaf: Field) -> PoolResult<u64> {
        if leaf.is_zero() {
            return Err(PoolError::InvalidInput("leaf cannot be zero".to_string()));
        }
        let index = self.leaf_count();
        if index >= self.capacity() {
            return Err(PoolError::CapacityExceeded {
                max_depth: self.max_depth,
            });
        }

        self.levels[0].push(leaf);
        let depth = ceil_log2(index + 1);
        while self.levels.len() <= depth {
            self.levels.push(Vec::new());
        }

        let mut node = leaf;
        let mut position = index as usize;
        for level in 0..depth {
            if position & 1 == 1 {
                node = PoseidonHasher::hash2(self.levels[level][position - 1], node);
            }
            position >>= 1;

            let parent = &mut self.levels[level + 1];
            if position < parent.len() {
                parent[position] = node;
            } else {
                parent.push(node);
            }
        }

        self.positions.entry(leaf).or_insert(index);
        Ok(index)
    }

    /// Append several leaves; nothing is inserted when they do not all fit
    pub fn insert_many(&mut self, leaves: &[Field]) -> PoolResult<Vec<u64>> {
        if self.leaf_count() + leaves.len() as u64 > self.capacity() {
            return Err(PoolError::CapacityExceeded {
                max_depth: self.max_depth,
            });
        }
        if leaves.iter().any(|leaf| leaf.is_zero()) {
            return Err(PoolError::InvalidInput("leaf cannot be zero".to_string()));
        }

        leaves.iter().map(|leaf| self.insert(*leaf)).collect()
    }

    /// Membership proof for `index` against the current root
    pub fn prove(&self, index: u64) -> PoolResult<MembershipProof> {
        if index >= self.leaf_count() {
            return Err(PoolError::NotInserted);
        }

        let depth = self.depth();
        let mut siblings = Vec::with_capacity(self.max_depth);
        let mut position = index as usize;
        for level in 0..depth {
            let nodes = &self.levels[level];
            let sibling = if position & 1 == 1 {
                nodes[position - 1]
            } else {
                // zero marks a node carried up without a right sibling
                nodes.get(position + 1).copied().unwrap_or_else(Field::zero)
            };
            siblings.push(sibling);
            position >>= 1;
        }
        siblings.resize(self.max_depth, Field::zero());

        Ok(MembershipProof {
            root: self.root(),
            depth,
            leaf_index: index,
            siblings,
        })
    }

    pub fn stats(&self) -> AccumulatorStats {
        AccumulatorStats {
            leaf_count: self.leaf_count(),
            depth: self.depth(),
            max_depth: self.max_depth,
            root: self.root(),
        }
    }
}

/// Accumulator statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorStats {
    pub leaf_count: u64,
    pub depth: usize,
    pub max_depth: usize,
    #[serde(with = "crate::crypto::field::decimal")]
    pub root: Field,
}

fn ceil_log2(n: u64) -> usize {
    if n <= 1 {
        0
    } else {
        (64 - (n - 1).leading_zeros()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(i: u64) -> Field {
        Field::from(i + 1)
    }

    #[test]
    fn test_empty_tree() {
        let tree = Accumulator::new(32).unwrap();
        assert_eq!(tree.root(), Field::zero());
        assert_eq!(tree.depth(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.prove(0).unwrap_err(), PoolError::NotInserted);
    }

    #[test]
    fn test_invalid_depth() {
        assert!(Accumulator::new(0).is_err());
        assert!(Accumulator::new(33).is_err());
    }

    #[test]
    fn test_small_roots() {
        let mut tree = Accumulator::new(32).unwrap();
        let (a, b, c) = (leaf(0), leaf(1), leaf(2));

        tree.insert(a).unwrap();
        assert_eq!(tree.root(), a);
        assert_eq!(tree.depth(), 0);

        tree.insert(b).unwrap();
        let ab = PoseidonHasher::hash2(a, b);
        assert_eq!(tree.root(), ab);
        assert_eq!(tree.depth(), 1);

        // c has no sibling and is carried up
        tree.insert(c).unwrap();
        assert_eq!(tree.root(), PoseidonHasher::hash2(ab, c));
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_indices_are_sequential() {
        let mut tree = Accumulator::new(8).unwrap();
        for i in 0..10 {
            assert_eq!(tree.insert(leaf(i)).unwrap(), i);
        }
        assert_eq!(tree.leaf_count(), 10);
        assert_eq!(tree.index_of(&leaf(7)), Some(7));
        assert_eq!(tree.index_of(&leaf(100)), None);
    }

    #[test]
    fn test_rejects_zero_leaf() {
        let mut tree = Accumulator::new(4).unwrap();
        assert!(matches!(tree.insert(Field::zero()), Err(PoolError::InvalidInput(_))));
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut tree = Accumulator::new(2).unwrap();
        for i in 0..4 {
            tree.insert(leaf(i)).unwrap();
        }
        assert_eq!(
            tree.insert(leaf(4)),
            Err(PoolError::CapacityExceeded { max_depth: 2 })
        );

        let mut tree = Accumulator::new(2).unwrap();
        tree.insert(leaf(0)).unwrap();
        assert!(tree.insert_many(&[leaf(1), leaf(2), leaf(3), leaf(4)]).is_err());
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_every_proof_verifies() {
        let mut tree = Accumulator::new(32).unwrap();
        for n in 0..33u64 {
            tree.insert(leaf(n)).unwrap();
            for i in 0..=n {
                let proof = tree.prove(i).unwrap();
                assert_eq!(proof.siblings.len(), 32);
                assert_eq!(proof.root, tree.root());
                assert!(proof.verify(&leaf(i)), "leaf {} of {}", i, n + 1);
                assert!(!proof.verify(&leaf(i + 100)));
            }
        }
    }

    #[test]
    fn test_stats() {
        let mut tree = Accumulator::new(16).unwrap();
        tree.insert_many(&[leaf(0), leaf(1), leaf(2), leaf(3), leaf(4)]).unwrap();
        let stats = tree.stats();
        assert_eq!(stats.leaf_count, 5);
        assert_eq!(stats.depth, 3);
        assert_eq!(stats.max_depth, 16);
        assert_eq!(stats.root, tree.root());
    }
}
