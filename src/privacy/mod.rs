//! Privacy Module
//! Pool state, spend assembly and the prover seam

pub mod assembler;
pub mod nullifier_set;
pub mod prover;
pub mod signal;
pub mod state;
pub mod types;

// Re-export shared types
pub use types::{PoolStats, TransitionOutcome};

// Re-export main types
pub use assembler::{PrivateSignals, PublicSignals, SignalAssembler, SignalBundle, SpendRequest};
pub use nullifier_set::NullifierSet;
pub use prover::{Groth16Proof, ProverGateway};
pub use signal::{encode_signal, signal_hash, Address};
pub use state::PoolState;
