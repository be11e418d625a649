//! Privacy pool core
//!
//! Commitments over Poseidon, nullifiers bound to EdDSA signatures, a lean
//! incremental Merkle accumulator and the assembler that lays out circuit
//! signals for an external Groth16 prover.

// Organized modules
pub mod config;
pub mod crypto;
pub mod error;
pub mod merkle;
pub mod privacy;
pub mod utxo;

// Re-export main types for easy access
pub use config::PoolConfig;
pub use crypto::{Ciphertext, EddsaPoseidon, Field, PoseidonHasher, PrivacyKey, PublicKey, Scalar, Signature};
pub use error::{DecryptionFailure, PoolError, PoolResult};
pub use merkle::{Accumulator, MembershipProof};
pub use privacy::{
    signal_hash, Address, Groth16Proof, NullifierSet, PoolState, PoolStats, PrivateSignals, ProverGateway,
    PublicSignals, SignalAssembler, SignalBundle, SpendRequest, TransitionOutcome,
};
pub use utxo::{Commitment, Note, PrivateView, PublicView};
