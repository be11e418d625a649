//! Field element representation and boundary conversions
//!
//! Inside the crate every field value is an `ark_bn254::Fr`. Strings and byte
//! arrays only appear where values cross into JSON, ciphertexts or circuit
//! input files.

use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::CanonicalDeserialize;

use crate::error::{PoolError, PoolResult};

/// Canonical field element (BN254 scalar field, Baby Jubjub base field)
pub type Field = ark_bn254::Fr;

/// Scalar field of the Baby Jubjub prime-order subgroup
pub type Scalar = ark_ed_on_bn254::Fr;

/// Byte width of an encoded field element
pub const FIELD_BYTES: usize = 32;

/// Decimal string, the encoding circuit input files use
pub fn to_decimal(value: &Field) -> String {
    value.into_bigint().to_string()
}

/// Parse a decimal string, rejecting values outside the field
pub fn from_decimal(s: &str) -> PoolResult<Field> {
    let digits = s.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PoolError::Serialization(format!("not a decimal field element: {:?}", s)));
    }

    let ten = Field::from(10u64);
    let mut acc = Field::zero();
    for b in digits.bytes() {
        acc = acc * ten + Field::from(u64::from(b - b'0'));
    }

    // Reduction would silently wrap anything >= p
    let canonical = to_decimal(&acc);
    if canonical != digits.trim_start_matches('0') && !(acc.is_zero() && digits.bytes().all(|b| b == b'0')) {
        return Err(PoolError::Serialization(format!("value exceeds field modulus: {}", digits)));
    }
    Ok(acc)
}

/// 0x-prefixed big-endian hex
pub fn to_hex(value: &Field) -> String {
    format!("0x{}", hex::encode(value.into_bigint().to_bytes_be()))
}

/// Parse 0x-prefixed (or bare) big-endian hex, rejecting non-canonical values
pub fn from_hex(s: &str) -> PoolResult<Field> {
    let stripped = s.trim().trim_start_matches("0x");
    let padded = if stripped.len() % 2 == 1 {
        format!("0{}", stripped)
    } else {
        stripped.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| PoolError::Serialization(e.to_string()))?;
    if bytes.len() > FIELD_BYTES {
        return Err(PoolError::Serialization(format!("hex value longer than {} bytes", FIELD_BYTES)));
    }

    let mut be = [0u8; FIELD_BYTES];
    be[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
    let value = Field::from_be_bytes_mod_order(&be);
    if value.into_bigint().to_bytes_be() != be {
        return Err(PoolError::Serialization(format!("value exceeds field modulus: {}", s)));
    }
    Ok(value)
}

/// Embed a signed integer, negative values map to `p - |v|`
pub fn from_signed(value: i128) -> Field {
    let magnitude = Field::from(value.unsigned_abs());
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Little-endian canonical encoding
pub fn to_le_bytes(value: &Field) -> [u8; FIELD_BYTES] {
    let mut out = [0u8; FIELD_BYTES];
    out.copy_from_slice(&value.into_bigint().to_bytes_le());
    out
}

/// Decode little-endian bytes, `None` when the value is not canonical
pub fn from_le_bytes(bytes: &[u8]) -> Option<Field> {
    if bytes.len() != FIELD_BYTES {
        return None;
    }
    Field::deserialize_compressed(bytes).ok()
}

/// Move a curve scalar into the base field (exact, the subgroup order is below p)
pub fn scalar_to_field(scalar: &Scalar) -> Field {
    Field::from_le_bytes_mod_order(&scalar.into_bigint().to_bytes_le())
}

/// Reduce a field element into the curve scalar field
pub fn field_to_scalar(value: &Field) -> Scalar {
    Scalar::from_le_bytes_mod_order(&value.into_bigint().to_bytes_le())
}

/// Serde adapter: field element as decimal string
pub mod decimal {
    use super::{from_decimal, to_decimal, Field};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Field, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Field, D::Error> {
        let s = String::deserialize(deserializer)?;
        from_decimal(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: sequence of field elements as decimal strings
pub mod decimal_vec {
    use super::{from_decimal, to_decimal, Field};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Field], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&to_decimal(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Field>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| from_decimal(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Serde adapter: rows of field elements as decimal strings
pub mod decimal_matrix {
    use super::{from_decimal, to_decimal, Field};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(rows: &[Vec<Field>], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(to_decimal).collect())
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<Field>>, D::Error> {
        let raw = Vec::<Vec<String>>::deserialize(deserializer)?;
        raw.iter()
            .map(|row| {
                row.iter()
                    .map(|s| from_decimal(s).map_err(serde::de::Error::custom))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    #[test]
    fn test_decimal_conversion() {
        let value = Field::from(123456789u64);
        assert_eq!(to_decimal(&value), "123456789");
        assert_eq!(from_decimal("123456789").unwrap(), value);
        assert_eq!(from_decimal("0").unwrap(), Field::zero());
        assert_eq!(to_decimal(&Field::zero()), "0");
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        assert!(from_decimal("").is_err());
        assert!(from_decimal("12a").is_err());
        assert!(from_decimal("-1").is_err());

        // p itself does not fit
        let modulus = Field::MODULUS.to_string();
        assert!(from_decimal(&modulus).is_err());
    }

    #[test]
    fn test_hex_conversion() {
        let value = Field::from(0xdeadbeefu64);
        let encoded = to_hex(&value);
        assert!(encoded.starts_with("0x"));
        assert_eq!(from_hex(&encoded).unwrap(), value);
        assert_eq!(from_hex("0xdeadbeef").unwrap(), value);
        assert_eq!(from_hex("abc").unwrap(), Field::from(0xabcu64));
        assert!(from_hex(&format!("0x{}", "ff".repeat(32))).is_err());
    }

    #[test]
    fn test_signed_embedding() {
        assert_eq!(from_signed(5), Field::from(5u64));
        assert_eq!(from_signed(-2) + Field::from(2u64), Field::zero());
        assert_eq!(from_signed(0), Field::zero());
    }

    #[test]
    fn test_le_bytes() {
        let value = -Field::one();
        let bytes = to_le_bytes(&value);
        assert_eq!(from_le_bytes(&bytes), Some(value));
        assert_eq!(from_le_bytes(&[0xffu8; 32]), None);
        assert_eq!(from_le_bytes(&[0u8; 31]), None);
    }

    #[test]
    fn test_scalar_round_trip() {
        let scalar = Scalar::from(987654321u64);
        let field = scalar_to_field(&scalar);
        assert_eq!(field, Field::from(987654321u64));
        assert_eq!(field_to_scalar(&field), scalar);
    }
}
