//! Commitment (UTXO record)
//!
//! A commitment binds a value and a blinding salt to an owner public key:
//! `hash = H4(value, owner.x, owner.y, salt)`. Once the pool inserts it, the
//! commitment carries its permanent leaf index and can be nullified by its
//! owner.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use ark_ff::{BigInteger, PrimeField, Zero};
use ark_std::UniformRand;
use serde::{Deserialize, Serialize};

use crate::crypto::field::{self, to_le_bytes};
use crate::crypto::{Ciphertext, Field, PoseidonHasher, PrivacyKey, PublicKey, Signature};
use crate::error::{DecryptionFailure, PoolError, PoolResult};

/// Number of field elements encrypted per commitment (value, salt)
pub const SECRET_LEN: usize = 2;

/// Value and salt of a commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    /// Zero-value padding slot
    Dummy,
    /// Shielded amount with its blinding salt
    Real { value: u64, salt: Field },
}

impl Note {
    pub fn value(&self) -> u64 {
        match self {
            Note::Dummy => 0,
            Note::Real { value, .. } => *value,
        }
    }

    pub fn salt(&self) -> Field {
        match self {
            Note::Dummy => Field::zero(),
            Note::Real { salt, .. } => *salt,
        }
    }
}

/// Fresh random blinding salt
pub fn random_salt() -> Field {
    Field::rand(&mut rand::thread_rng())
}

/// UTXO commitment
#[derive(Debug, Clone)]
pub struct Commitment {
    owner: PublicKey,
    note: Note,
    nonce: u64,
    index: Option<u64>,
    hash: OnceLock<Field>,
}

impl Commitment {
    /// Create a commitment; `value == 0` with `salt == 0` yields a dummy
    pub fn create(owner: PublicKey, value: i128, salt: Field, nonce: u64) -> PoolResult<Self> {
        if value < 0 {
            return Err(PoolError::NegativeValue(value));
        }
        let value = u64::try_from(value).map_err(|_| PoolError::ValueOutOfRange(value))?;

        let note = if value == 0 && salt.is_zero() {
            Note::Dummy
        } else {
            Note::Real { value, salt }
        };

        Ok(Self::from_note(owner, note, nonce))
    }

    /// Create a commitment owned by `key` with a random salt and the key's next nonce
    pub fn new_for(key: &PrivacyKey, value: i128) -> PoolResult<Self> {
        Self::create(*key.public_key(), value, random_salt(), key.next_nonce())
    }

    /// Padding commitment owned by `owner`
    pub fn dummy(owner: PublicKey) -> Self {
        Self::from_note(owner, Note::Dummy, 0)
    }

    fn from_note(owner: PublicKey, note: Note, nonce: u64) -> Self {
        Self {
            owner,
            note,
            nonce,
            index: None,
            hash: OnceLock::new(),
        }
    }

    pub fn hash(&self) -> Field {
        *self.hash.get_or_init(|| {
            PoseidonHasher::hash4([
                Field::from(self.note.value()),
                self.owner.x(),
                self.owner.y(),
                self.note.salt(),
            ])
        })
    }

    pub fn owner(&self) -> &PublicKey {
        &self.owner
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn value(&self) -> u64 {
        self.note.value()
    }

    pub fn salt(&self) -> Field {
        self.note.salt()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn index(&self) -> Option<u64> {
        self.index
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self.note, Note::Dummy)
    }

    /// Record the leaf index assigned by the accumulator; allowed once
    pub fn set_index(&mut self, index: u64) -> PoolResult<()> {
        if let Some(existing) = self.index {
            return Err(PoolError::AlreadyInserted(existing));
        }
        log::debug!("Commitment {} inserted at index {}", Commitment::hash(self), index);
        self.index = Some(index);
        Ok(())
    }

    /// Index the nullifier binds to. Dummies are never inserted and use 0.
    fn spend_index(&self) -> PoolResult<u64> {
        match (self.index, self.is_dummy()) {
            (Some(index), _) => Ok(index),
            (None, true) => Ok(0),
            (None, false) => Err(PoolError::NotInserted),
        }
    }

    /// Message the owner signs to authorize spending: `H4(owner.x, owner.y, hash, index)`
    pub fn signature_message(&self) -> PoolResult<Field> {
        let index = self.spend_index()?;
        Ok(PoseidonHasher::hash4([
            self.owner.x(),
            self.owner.y(),
            self.hash(),
            Field::from(index),
        ]))
    }

    /// Sign the spend message with `key`
    pub fn sign(&self, key: &PrivacyKey) -> PoolResult<Signature> {
        let message = self.signature_message()?;
        key.sign(message)
    }

    /// `H5(hash, index, R8.x, R8.y, S)`
    pub fn compute_nullifier(&self, signature: &Signature) -> PoolResult<Field> {
        let index = self.spend_index()?;
        let [r8_x, r8_y, s] = signature.as_fields();
        Ok(PoseidonHasher::hash5([self.hash(), Field::from(index), r8_x, r8_y, s]))
    }

    /// Sign and derive the nullifier in one step
    pub fn nullifier(&self, key: &PrivacyKey) -> PoolResult<(Signature, Field)> {
        let signature = self.sign(key)?;
        let nullifier = self.compute_nullifier(&signature)?;
        Ok((signature, nullifier))
    }

    /// Fields safe to publish; `(value, salt)` is encrypted to the owner
    pub fn to_public_view(&self, key: &PrivacyKey) -> PoolResult<PublicView> {
        if key.public_key() != &self.owner {
            return Err(PoolError::MalformedKey(
                "key does not own this commitment".to_string(),
            ));
        }

        let ciphertext = key.encrypt(&[Field::from(self.value()), self.salt()], self.nonce)?;
        Ok(PublicView {
            hash: self.hash(),
            owner_hash: self.owner.hash(),
            ciphertext,
            nonce: self.nonce,
            index: self.index,
        })
    }

    /// Raw values; never leaves the owner's process
    pub fn to_private_view(&self) -> PrivateView {
        PrivateView {
            owner: self.owner,
            value: self.value(),
            salt: self.salt(),
            nonce: self.nonce,
            index: self.index,
        }
    }

    /// Rebuild a commitment from its private view
    pub fn from_private_view(view: &PrivateView) -> PoolResult<Self> {
        let mut commitment =
            Self::create(view.owner, i128::from(view.value), view.salt, view.nonce)?;
        commitment.index = view.index;
        Ok(commitment)
    }

    /// Decrypt a public view addressed to `key` and check it against the published hash
    pub fn recover(key: &PrivacyKey, view: &PublicView) -> Result<Self, DecryptionFailure> {
        let secrets = key.decrypt(&view.ciphertext, view.nonce, SECRET_LEN)?;
        let value = field_to_u64(&secrets[0]).ok_or(DecryptionFailure::Malformed)?;

        let note = if value == 0 && secrets[1].is_zero() {
            Note::Dummy
        } else {
            Note::Real {
                value,
                salt: secrets[1],
            }
        };
        let mut commitment = Self::from_note(*key.public_key(), note, view.nonce);
        if commitment.hash() != view.hash {
            return Err(DecryptionFailure::HashMismatch);
        }

        commitment.index = view.index;
        Ok(commitment)
    }
}

fn field_to_u64(value: &Field) -> Option<u64> {
    let bytes = value.into_bigint().to_bytes_le();
    if bytes[8..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(low))
}

impl PartialEq for Commitment {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Commitment {}

impl Hash for Commitment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        to_le_bytes(&Commitment::hash(self)).hash(state);
    }
}

/// Publishable half of a commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicView {
    #[serde(with = "field::decimal")]
    pub hash: Field,
    #[serde(with = "field::decimal")]
    pub owner_hash: Field,
    pub ciphertext: Ciphertext,
    pub nonce: u64,
    pub index: Option<u64>,
}

/// Owner-only half of a commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateView {
    pub owner: PublicKey,
    pub value: u64,
    #[serde(with = "field::decimal")]
    pub salt: Field,
    pub nonce: u64,
    pub index: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Scalar;

    fn key(seed: u64) -> PrivacyKey {
        PrivacyKey::generate(Some(Scalar::from(seed))).unwrap()
    }

    fn commitment(key: &PrivacyKey, value: i128, salt: u64) -> Commitment {
        Commitment::create(*key.public_key(), value, Field::from(salt), 0).unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let k = key(1);
        let a = commitment(&k, 100, 7);
        let b = commitment(&k, 100, 7);
        assert_eq!(a.hash(), a.hash());
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a, b);

        let expected = PoseidonHasher::hash4([
            Field::from(100u64),
            k.public_key().x(),
            k.public_key().y(),
            Field::from(7u64),
        ]);
        assert_eq!(a.hash(), expected);
        assert_ne!(a, commitment(&k, 101, 7));
    }

    #[test]
    fn test_value_validation() {
        let k = key(1);
        assert_eq!(
            Commitment::create(*k.public_key(), -1, Field::from(1u64), 0).unwrap_err(),
            PoolError::NegativeValue(-1)
        );
        let too_big = i128::from(u64::MAX) + 1;
        assert_eq!(
            Commitment::create(*k.public_key(), too_big, Field::from(1u64), 0).unwrap_err(),
            PoolError::ValueOutOfRange(too_big)
        );
    }

    #[test]
    fn test_dummy_invariant() {
        let k = key(1);
        assert!(commitment(&k, 0, 0).is_dummy());
        assert!(Commitment::dummy(*k.public_key()).is_dummy());
        assert!(!commitment(&k, 0, 5).is_dummy());
        assert!(!commitment(&k, 5, 0).is_dummy());
        assert_eq!(commitment(&k, 0, 0), Commitment::dummy(*k.public_key()));
    }

    #[test]
    fn test_set_index_once() {
        let k = key(1);
        let mut c = commitment(&k, 10, 3);
        assert_eq!(c.index(), None);
        c.set_index(4).unwrap();
        assert_eq!(c.index(), Some(4));
        assert_eq!(c.set_index(5), Err(PoolError::AlreadyInserted(4)));
        assert_eq!(c.index(), Some(4));
    }

    #[test]
    fn test_nullifier_requires_index() {
        let k = key(1);
        let mut c = commitment(&k, 10, 3);
        assert_eq!(c.nullifier(&k).unwrap_err(), PoolError::NotInserted);

        c.set_index(0).unwrap();
        let (signature, nullifier) = c.nullifier(&k).unwrap();
        assert!(k.verify(&signature, c.signature_message().unwrap()));
        assert_eq!(c.compute_nullifier(&signature).unwrap(), nullifier);
    }

    #[test]
    fn test_nullifier_binds_index_and_hash() {
        let k = key(1);
        let mut a = commitment(&k, 10, 3);
        let mut b = commitment(&k, 10, 3);
        let mut c = commitment(&k, 11, 3);
        a.set_index(0).unwrap();
        b.set_index(1).unwrap();
        c.set_index(0).unwrap();

        let (_, na) = a.nullifier(&k).unwrap();
        let (_, nb) = b.nullifier(&k).unwrap();
        let (_, nc) = c.nullifier(&k).unwrap();
        assert_ne!(na, nb);
        assert_ne!(na, nc);
        assert_eq!(a.nullifier(&k).unwrap().1, na);
    }

    #[test]
    fn test_public_view_recovery() {
        let k = key(2);
        let mut c = Commitment::new_for(&k, 250).unwrap();
        c.set_index(9).unwrap();

        let view = c.to_public_view(&k).unwrap();
        assert_eq!(view.owner_hash, k.pub_key_hash());

        let recovered = Commitment::recover(&k, &view).unwrap();
        assert_eq!(recovered, c);
        assert_eq!(recovered.value(), 250);
        assert_eq!(recovered.index(), Some(9));

        assert_eq!(Commitment::recover(&key(3), &view).unwrap_err(), DecryptionFailure::Authentication);

        let mut forged = view.clone();
        forged.hash = Field::from(1u64);
        assert_eq!(Commitment::recover(&k, &forged).unwrap_err(), DecryptionFailure::HashMismatch);
    }

    #[test]
    fn test_public_view_requires_owner() {
        let c = commitment(&key(1), 5, 5);
        assert!(matches!(c.to_public_view(&key(2)), Err(PoolError::MalformedKey(_))));
    }

    #[test]
    fn test_views_serialize() {
        let k = key(4);
        let c = commitment(&k, 42, 99);

        let json = serde_json::to_string(&c.to_private_view()).unwrap();
        assert!(json.contains("\"salt\":\"99\""));
        let view: PrivateView = serde_json::from_str(&json).unwrap();
        assert_eq!(Commitment::from_private_view(&view).unwrap(), c);

        let public = c.to_public_view(&k).unwrap();
        let json = serde_json::to_string(&public).unwrap();
        let back: PublicView = serde_json::from_str(&json).unwrap();
        assert_eq!(back, public);
    }
}
