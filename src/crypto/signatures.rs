//! EdDSA over Baby Jubjub with a Poseidon challenge
//!
//! The scheme the spend circuit verifies: `R8 = r*B`, `h = H5(R8, A, msg)`,
//! `S = r + h*sk`, accepted iff `S*B == R8 + h*A`.

use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::EdwardsAffine;
use ark_ff::{PrimeField, Zero};
use blake2::{Blake2s256, Digest};
use serde::{Deserialize, Serialize};

use crate::crypto::field::{self, field_to_scalar, scalar_to_field, to_le_bytes};
use crate::crypto::{domains, Field, PoseidonHasher, Scalar};
use crate::error::{PoolError, PoolResult};

/// Baby Jubjub point in affine form
pub type Point = EdwardsAffine;

/// Generator of the prime-order subgroup
pub fn base_point() -> Point {
    Point::generator()
}

/// EdDSA signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SignatureRepr", into = "SignatureRepr")]
pub struct Signature {
    /// Commitment to the signing nonce
    pub r8: Point,
    /// Response scalar
    pub s: Scalar,
}

impl Signature {
    /// Rebuild a signature from raw circuit values without validating it.
    /// `s` is reduced mod the subgroup order; see `try_from_parts`.
    pub fn from_parts(r8_x: Field, r8_y: Field, s: Field) -> Self {
        Self {
            r8: Point::new_unchecked(r8_x, r8_y),
            s: field_to_scalar(&s),
        }
    }

    /// Like `from_parts`, but rejects a response `s` outside the subgroup order
    pub fn try_from_parts(r8_x: Field, r8_y: Field, s: Field) -> PoolResult<Self> {
        if s.into_bigint() >= Scalar::MODULUS {
            return Err(PoolError::InvalidInput(
                "signature response is not reduced mod the subgroup order".to_string(),
            ));
        }
        Ok(Self::from_parts(r8_x, r8_y, s))
    }

    /// `[R8.x, R8.y, S]` as the circuit sees them
    pub fn as_fields(&self) -> [Field; 3] {
        [self.r8.x, self.r8.y, scalar_to_field(&self.s)]
    }
}

#[derive(Serialize, Deserialize)]
struct SignatureRepr {
    #[serde(with = "field::decimal")]
    r8_x: Field,
    #[serde(with = "field::decimal")]
    r8_y: Field,
    #[serde(with = "field::decimal")]
    s: Field,
}

impl TryFrom<SignatureRepr> for Signature {
    type Error = PoolError;

    fn try_from(repr: SignatureRepr) -> PoolResult<Self> {
        Signature::try_from_parts(repr.r8_x, repr.r8_y, repr.s)
    }
}

impl From<Signature> for SignatureRepr {
    fn from(signature: Signature) -> Self {
        let [r8_x, r8_y, s] = signature.as_fields();
        Self { r8_x, r8_y, s }
    }
}

/// Baby Jubjub EdDSA-Poseidon scheme
pub struct EddsaPoseidon;

impl EddsaPoseidon {
    /// Derive the public point for a scalar
    pub fn public_point(secret: &Scalar) -> Point {
        (base_point() * secret).into_affine()
    }

    /// Sign a field message
    pub fn sign(secret: &Scalar, message: Field) -> PoolResult<Signature> {
        if secret.is_zero() {
            return Err(PoolError::SigningError("private scalar is zero".to_string()));
        }

        let public = Self::public_point(secret);
        let r = Self::nonce(secret, &message);
        let r8 = (base_point() * r).into_affine();
        let h = Self::challenge(&r8, &public, message);

        Ok(Signature { r8, s: r + h * secret })
    }

    /// Verify a signature; malformed points yield `false`
    pub fn verify(signature: &Signature, public: &Point, message: Field) -> bool {
        if !Self::is_valid_point(public) || AffineRepr::is_zero(public) {
            return false;
        }
        if !Self::is_valid_point(&signature.r8) {
            return false;
        }

        let h = Self::challenge(&signature.r8, public, message);
        let lhs = base_point() * signature.s;
        let rhs = signature.r8.into_group() + *public * h;
        lhs == rhs
    }

    fn is_valid_point(point: &Point) -> bool {
        point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()
    }

    /// Deterministic nonce bound to the key and message
    fn nonce(secret: &Scalar, message: &Field) -> Scalar {
        let mut hasher = Blake2s256::new();
        hasher.update(domains::DOMAIN_SIGN);
        hasher.update(to_le_bytes(&scalar_to_field(secret)));
        hasher.update(to_le_bytes(message));
        Scalar::from_le_bytes_mod_order(&hasher.finalize())
    }

    fn challenge(r8: &Point, public: &Point, message: Field) -> Scalar {
        let h = PoseidonHasher::hash5([r8.x, r8.y, public.x, public.y, message]);
        field_to_scalar(&h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> Scalar {
        Scalar::from(0x5eed_u64)
    }

    #[test]
    fn test_sign_and_verify() {
        let sk = secret();
        let pk = EddsaPoseidon::public_point(&sk);
        let msg = Field::from(42u64);

        let sig = EddsaPoseidon::sign(&sk, msg).unwrap();
        assert!(EddsaPoseidon::verify(&sig, &pk, msg));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let sk = secret();
        let msg = Field::from(7u64);
        let a = EddsaPoseidon::sign(&sk, msg).unwrap();
        let b = EddsaPoseidon::sign(&sk, msg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_message_or_key_rejected() {
        let sk = secret();
        let pk = EddsaPoseidon::public_point(&sk);
        let sig = EddsaPoseidon::sign(&sk, Field::from(1u64)).unwrap();

        assert!(!EddsaPoseidon::verify(&sig, &pk, Field::from(2u64)));

        let other = EddsaPoseidon::public_point(&Scalar::from(99u64));
        assert!(!EddsaPoseidon::verify(&sig, &other, Field::from(1u64)));
    }

    #[test]
    fn test_zero_scalar_cannot_sign() {
        let result = EddsaPoseidon::sign(&Scalar::zero(), Field::from(1u64));
        assert!(matches!(result, Err(PoolError::SigningError(_))));
    }

    #[test]
    fn test_malformed_signature_is_false() {
        let sk = secret();
        let pk = EddsaPoseidon::public_point(&sk);
        let msg = Field::from(3u64);
        let sig = EddsaPoseidon::sign(&sk, msg).unwrap();

        // R8 off the curve
        let [x, y, s] = sig.as_fields();
        let bad = Signature::from_parts(x + Field::from(1u64), y, s);
        assert!(!EddsaPoseidon::verify(&bad, &pk, msg));

        // tampered response
        let tampered = Signature::from_parts(x, y, s + Field::from(1u64));
        assert!(!EddsaPoseidon::verify(&tampered, &pk, msg));

        // identity public key
        assert!(!EddsaPoseidon::verify(&sig, &<Point as AffineRepr>::zero(), msg));
    }

    #[test]
    fn test_parts_round_trip() {
        let sig = EddsaPoseidon::sign(&secret(), Field::from(11u64)).unwrap();
        let [x, y, s] = sig.as_fields();
        assert_eq!(Signature::from_parts(x, y, s), sig);

        let json = serde_json::to_string(&sig).unwrap();
        assert!(json.contains("\"r8_x\""));
        assert_eq!(serde_json::from_str::<Signature>(&json).unwrap(), sig);
    }

    #[test]
    fn test_unreduced_response_rejected() {
        let sig = EddsaPoseidon::sign(&secret(), Field::from(11u64)).unwrap();
        let [x, y, s] = sig.as_fields();
        let shifted = s + Field::from_bigint(Scalar::MODULUS).unwrap();

        assert!(Signature::try_from_parts(x, y, s).is_ok());
        assert!(matches!(
            Signature::try_from_parts(x, y, shifted),
            Err(PoolError::InvalidInput(_))
        ));
        assert_eq!(Signature::from_parts(x, y, shifted), sig);

        let mut value = serde_json::to_value(sig).unwrap();
        value["s"] = serde_json::Value::String(field::to_decimal(&shifted));
        assert!(serde_json::from_value::<Signature>(value).is_err());
    }
}
