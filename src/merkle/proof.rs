//! Membership proofs

use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use crate::crypto::field::{decimal, decimal_vec};
use crate::crypto::{Field, PoseidonHasher};

/// Proof that a leaf sits at `leaf_index` under `root`.
///
/// `siblings` always has `max_depth` entries; only the first `depth` are
/// meaningful. A zero sibling where the path node is a left child means the
/// node was carried up without hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    #[serde(with = "decimal")]
    pub root: Field,
    pub depth: usize,
    pub leaf_index: u64,
    #[serde(with = "decimal_vec")]
    pub siblings: Vec<Field>,
}

impl MembershipProof {
    /// All-zero proof used for dummy inputs
    pub fn zero(max_depth: usize) -> Self {
        Self {
            root: Field::zero(),
            depth: 0,
            leaf_index: 0,
            siblings: vec![Field::zero(); max_depth],
        }
    }

    /// Root obtained by replaying the path from `leaf`
    pub fn compute_root(&self, leaf: &Field) -> Option<Field> {
        if self.depth > self.siblings.len() || (self.depth < 64 && self.leaf_index >> self.depth != 0) {
            return None;
        }

        let mut node = *leaf;
        for (level, sibling) in self.siblings.iter().take(self.depth).enumerate() {
            if (self.leaf_index >> level) & 1 == 1 {
                node = PoseidonHasher::hash2(*sibling, node);
            } else if !sibling.is_zero() {
                node = PoseidonHasher::hash2(node, *sibling);
            }
        }
        Some(node)
    }

    /// Check the proof against its own root
    pub fn verify(&self, leaf: &Field) -> bool {
        self.compute_root(leaf) == Some(self.root)
    }
}
