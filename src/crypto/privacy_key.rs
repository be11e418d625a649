//! Privacy keys
//!
//! A `PrivacyKey` owns a Baby Jubjub scalar, its public point and a symmetric
//! key derived from the self-ECDH point `sk * pk`. The symmetric key encrypts
//! the owner's own commitment secrets with XChaCha20-Poly1305.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ark_ec::CurveGroup;
use ark_ff::{BigInteger, PrimeField};
use ark_std::UniformRand;
use aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use serde::{Deserialize, Serialize};

use crate::crypto::field::{self, from_le_bytes, to_le_bytes, FIELD_BYTES};
use crate::crypto::signatures::{EddsaPoseidon, Point, Signature};
use crate::crypto::{domains, CryptoUtils, Field, PoseidonHasher, Scalar};
use crate::error::{DecryptionFailure, PoolError, PoolResult};

/// Poly1305 tag length
const TAG_BYTES: usize = 16;

/// XChaCha20 nonce length
const NONCE_BYTES: usize = 24;

/// Public half of a privacy key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyRepr", into = "PublicKeyRepr")]
pub struct PublicKey {
    point: Point,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyRepr {
    #[serde(with = "field::decimal")]
    x: Field,
    #[serde(with = "field::decimal")]
    y: Field,
}

impl PublicKey {
    /// Build from affine coordinates, rejecting points off the curve or outside the subgroup
    pub fn from_coordinates(x: Field, y: Field) -> PoolResult<Self> {
        let point = Point::new_unchecked(x, y);
        if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(PoolError::MalformedKey(format!(
                "({}, {}) is not a Baby Jubjub subgroup point",
                x, y
            )));
        }
        Ok(Self { point })
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn x(&self) -> Field {
        self.point.x
    }

    pub fn y(&self) -> Field {
        self.point.y
    }

    /// `H2(x, y)`, the owner hash published alongside commitments
    pub fn hash(&self) -> Field {
        PoseidonHasher::hash2(self.point.x, self.point.y)
    }

    /// Verify a signature made by the matching private key
    pub fn verify(&self, signature: &Signature, message: Field) -> bool {
        EddsaPoseidon::verify(signature, &self.point, message)
    }
}

impl From<Point> for PublicKey {
    fn from(point: Point) -> Self {
        Self { point }
    }
}

impl TryFrom<PublicKeyRepr> for PublicKey {
    type Error = PoolError;

    fn try_from(repr: PublicKeyRepr) -> Result<Self, Self::Error> {
        Self::from_coordinates(repr.x, repr.y)
    }
}

impl From<PublicKey> for PublicKeyRepr {
    fn from(key: PublicKey) -> Self {
        Self {
            x: key.x(),
            y: key.y(),
        }
    }
}

/// Authenticated ciphertext (encrypted elements followed by the Poly1305 tag)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ciphertext(Vec<u8>);

impl Ciphertext {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for Ciphertext {
    type Error = PoolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        hex::decode(s.trim_start_matches("0x"))
            .map(Self)
            .map_err(|e| PoolError::Serialization(format!("invalid ciphertext hex: {}", e)))
    }
}

impl From<Ciphertext> for String {
    fn from(ciphertext: Ciphertext) -> Self {
        format!("0x{}", hex::encode(ciphertext.0))
    }
}

/// Owner key: private scalar, public point and self-shared AEAD key.
/// Clones share one nonce counter.
pub struct PrivacyKey {
    secret: Scalar,
    public: PublicKey,
    aead_key: [u8; 32],
    nonce_counter: Arc<AtomicU64>,
}

impl PrivacyKey {
    /// Create a key from `seed`, or from a fresh random scalar
    pub fn generate(seed: Option<Scalar>) -> PoolResult<Self> {
        let secret = seed.unwrap_or_else(|| Scalar::rand(&mut rand::thread_rng()));
        Self::from_scalar(secret)
    }

    /// Create a key from 32 little-endian bytes, reduced into the scalar field
    pub fn from_bytes(bytes: &[u8; 32]) -> PoolResult<Self> {
        Self::from_scalar(Scalar::from_le_bytes_mod_order(bytes))
    }

    /// Create a key from a hex-encoded 32-byte private key
    pub fn from_hex(s: &str) -> PoolResult<Self> {
        let bytes = hex::decode(s.trim().trim_start_matches("0x"))
            .map_err(|e| PoolError::MalformedKey(format!("invalid hex private key: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|raw: Vec<u8>| {
            PoolError::MalformedKey(format!("private key must be 32 bytes, got {}", raw.len()))
        })?;
        Self::from_bytes(&bytes)
    }

    fn from_scalar(secret: Scalar) -> PoolResult<Self> {
        let public = PublicKey::from(EddsaPoseidon::public_point(&secret));
        let shared = (*public.point() * secret).into_affine();

        let mut ikm = Vec::with_capacity(2 * FIELD_BYTES);
        ikm.extend_from_slice(&to_le_bytes(&shared.x));
        ikm.extend_from_slice(&to_le_bytes(&shared.y));
        let aead_key = CryptoUtils::hkdf_sha256(&ikm, domains::DOMAIN_ECDH, domains::DOMAIN_NOTE)?;

        log::debug!("Derived privacy key for owner {}", public.hash());

        Ok(Self {
            secret,
            public,
            aead_key,
            nonce_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// `H2(pub.x, pub.y)`
    pub fn pub_key_hash(&self) -> Field {
        self.public.hash()
    }

    /// Hand out the next unused encryption nonce
    pub fn next_nonce(&self) -> u64 {
        self.nonce_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn sign(&self, message: Field) -> PoolResult<Signature> {
        EddsaPoseidon::sign(&self.secret, message)
    }

    pub fn verify(&self, signature: &Signature, message: Field) -> bool {
        self.public.verify(signature, message)
    }

    /// Encrypt field elements under the self-shared key and `nonce`
    pub fn encrypt(&self, plaintext: &[Field], nonce: u64) -> PoolResult<Ciphertext> {
        let mut buffer = Vec::with_capacity(plaintext.len() * FIELD_BYTES);
        for element in plaintext {
            buffer.extend_from_slice(&to_le_bytes(element));
        }

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.aead_key));
        let bytes = cipher
            .encrypt(&Self::derive_nonce(nonce), buffer.as_slice())
            .map_err(|e| PoolError::Encryption(format!("{:?}", e)))?;

        Ok(Ciphertext(bytes))
    }

    /// Decrypt `expected_len` field elements; failures are returned, never raised
    pub fn decrypt(
        &self,
        ciphertext: &Ciphertext,
        nonce: u64,
        expected_len: usize,
    ) -> Result<Vec<Field>, DecryptionFailure> {
        let bytes = ciphertext.as_bytes();
        if bytes.len() < TAG_BYTES || (bytes.len() - TAG_BYTES) % FIELD_BYTES != 0 {
            return Err(DecryptionFailure::Malformed);
        }
        let actual = (bytes.len() - TAG_BYTES) / FIELD_BYTES;
        if actual != expected_len {
            return Err(DecryptionFailure::LengthMismatch {
                expected: expected_len,
                actual,
            });
        }

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.aead_key));
        let plaintext = cipher
            .decrypt(&Self::derive_nonce(nonce), bytes)
            .map_err(|_| DecryptionFailure::Authentication)?;

        plaintext
            .chunks(FIELD_BYTES)
            .map(|chunk| from_le_bytes(chunk).ok_or(DecryptionFailure::NonCanonical))
            .collect()
    }

    fn derive_nonce(nonce: u64) -> XNonce {
        let mut input = Vec::with_capacity(domains::DOMAIN_NONCE.len() + 8);
        input.extend_from_slice(domains::DOMAIN_NONCE);
        input.extend_from_slice(&nonce.to_le_bytes());
        let digest = CryptoUtils::blake2s256(&input);
        XNonce::clone_from_slice(&digest[..NONCE_BYTES])
    }
}

impl Clone for PrivacyKey {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret,
            public: self.public,
            aead_key: self.aead_key,
            nonce_counter: Arc::clone(&self.nonce_counter),
        }
    }
}

impl PartialEq for PrivacyKey {
    fn eq(&self, other: &Self) -> bool {
        CryptoUtils::constant_time_eq(
            &self.secret.into_bigint().to_bytes_le(),
            &other.secret.into_bigint().to_bytes_le(),
        )
    }
}

impl Eq for PrivacyKey {}

impl fmt::Debug for PrivacyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivacyKey")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}
