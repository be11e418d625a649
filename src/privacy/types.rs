//! Shared types for pool state

use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use crate::crypto::field::decimal;
use crate::crypto::Field;

/// Pool statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Current accumulator root
    #[serde(with = "decimal")]
    pub merkle_root: Field,
    /// Number of inserted commitments
    pub size: u64,
    /// Maximum number of commitments
    pub capacity: u64,
    /// Current tree depth
    pub depth: usize,
    /// Number of spent nullifiers
    pub nullifier_count: usize,
}

impl Default for PoolStats {
    fn default() -> Self {
        Self {
            merkle_root: Field::zero(),
            size: 0,
            capacity: 1u64 << 32,
            depth: 0,
            nullifier_count: 0,
        }
    }
}

/// Result of applying an accepted spend to pool state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Nullifiers recorded and outputs inserted at these indices
    Applied { output_indices: Vec<u64> },
    /// A nullifier was already spent; state is unchanged
    DoubleSpend(Field),
    /// The gateway did not accept the proof; state is unchanged
    ProofRejected,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}
