//! Cryptographic Primitives Module
//!
//! This module provides the primitives the pool core is built on:
//! - Field element representation and boundary conversions
//! - Fixed-arity Poseidon hashing (H2, H4, H5)
//! - EdDSA over Baby Jubjub with a Poseidon challenge
//! - Privacy keys: self-ECDH shared secret and AEAD of commitment secrets

use rand::RngCore;
use sha3::Digest;

pub mod field;
pub mod poseidon;
pub mod privacy_key;
pub mod signatures;

// Re-export main types
pub use field::{Field, Scalar};
pub use poseidon::PoseidonHasher;
pub use privacy_key::{Ciphertext, PrivacyKey, PublicKey};
pub use signatures::{EddsaPoseidon, Point, Signature};

use crate::error::{PoolError, PoolResult};

/// Domain constants for cryptographic operations
pub mod domains {
    /// Domain separator for Poseidon round constants
    pub const DOMAIN_POSEIDON: &[u8] = b"privacy-pool-poseidon";

    /// Domain separator for deterministic signing nonces
    pub const DOMAIN_SIGN: &[u8] = b"privacy-pool-eddsa-nonce";

    /// Domain separator for commitment secret encryption keys
    pub const DOMAIN_NOTE: &[u8] = b"privacy-pool-note";

    /// Domain separator for AEAD nonces
    pub const DOMAIN_NONCE: &[u8] = b"privacy-pool-note-nonce";

    /// Domain separator for ECDH key derivation
    pub const DOMAIN_ECDH: &[u8] = b"privacy-pool-ecdh";
}

/// Cryptographic utilities
pub struct CryptoUtils;

impl CryptoUtils {
    /// Generate random 32-byte array
    pub fn random_32() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Hash data with Blake2s-256
    pub fn blake2s256(data: &[u8]) -> [u8; 32] {
        blake2::Blake2s256::digest(data).into()
    }

    /// Hash data with Keccak-256
    pub fn keccak256(data: &[u8]) -> [u8; 32] {
        sha3::Keccak256::digest(data).into()
    }

    /// Constant-time comparison of byte arrays
    pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
        use subtle::ConstantTimeEq;
        a.ct_eq(b).into()
    }

    /// HKDF-SHA256 key derivation
    pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8]) -> PoolResult<[u8; 32]> {
        let hkdf = hkdf::Hkdf::<sha2::Sha256>::new(Some(salt), ikm);
        let mut okm = [0u8; 32];
        hkdf.expand(info, &mut okm)
            .map_err(|e| PoolError::MalformedKey(format!("HKDF expand failed: {}", e)))?;
        Ok(okm)
    }
}
