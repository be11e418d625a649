//! Error types for the privacy pool core
//!
//! Validation and state-consistency failures are `PoolError`. Decryption
//! failures are expected while scanning ciphertexts and live in their own
//! type so callers can treat them as ordinary outcomes.

use crate::crypto::Field;

/// Pool error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("arity mismatch: expected {expected} inputs and outputs, got {inputs} inputs and {outputs} outputs")]
    ArityMismatch {
        expected: usize,
        inputs: usize,
        outputs: usize,
    },

    #[error("negative value: {0}")]
    NegativeValue(i128),

    #[error("value out of range: {0}")]
    ValueOutOfRange(i128),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("input {position} is not spendable: {reason}")]
    UnspendableInput { position: usize, reason: String },

    #[error("stale membership proof for leaf {leaf_index}: proof root {proof_root}, current root {current_root}")]
    StaleProof {
        leaf_index: u64,
        proof_root: Field,
        current_root: Field,
    },

    #[error("commitment already inserted at index {0}")]
    AlreadyInserted(u64),

    #[error("commitment has not been inserted into the accumulator")]
    NotInserted,

    #[error("accumulator capacity exceeded (max depth {max_depth})")]
    CapacityExceeded { max_depth: usize },

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("prover error: {0}")]
    Prover(String),
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Outcome of a failed decryption.
///
/// Returned as a value, never raised: most ciphertexts seen while scanning
/// are simply not addressed to the local key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecryptionFailure {
    #[error("ciphertext is malformed")]
    Malformed,

    #[error("ciphertext holds {actual} elements, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("authentication tag mismatch")]
    Authentication,

    #[error("decrypted element is not a canonical field element")]
    NonCanonical,

    #[error("recovered commitment does not match the published hash")]
    HashMismatch,
}
