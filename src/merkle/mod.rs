//! Merkle Tree Module
//! Lean incremental accumulator with Poseidon node hashing

pub mod lean_tree;
pub mod proof;

// Re-export main types
pub use lean_tree::{Accumulator, AccumulatorStats, MAX_SUPPORTED_DEPTH};
pub use proof::MembershipProof;
