//! External-transfer binding hash
//!
//! `signal_hash = keccak256(abi.encode(pool, publicValue, fee, account, feeCollector))`
//! reduced into the field. It ties a proof to one recipient and fee pairing.

use std::fmt;
use std::str::FromStr;

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoUtils, Field};
use crate::error::PoolError;

/// ABI word size
const WORD: usize = 32;

/// 20-byte Ethereum address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    fn abi_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        word[WORD - 20..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim().trim_start_matches("0x"))
            .map_err(|e| PoolError::InvalidInput(format!("invalid address {:?}: {}", s, e)))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| PoolError::InvalidInput(format!("address must be 20 bytes: {:?}", s)))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = PoolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

fn int256_word(value: i128) -> [u8; WORD] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn uint256_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// ABI encoding of the signal tuple
pub fn encode_signal(
    pool: &Address,
    public_value: i128,
    fee: u128,
    account: &Address,
    fee_collector: &Address,
) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(5 * WORD);
    encoded.extend_from_slice(&pool.abi_word());
    encoded.extend_from_slice(&int256_word(public_value));
    encoded.extend_from_slice(&uint256_word(fee));
    encoded.extend_from_slice(&account.abi_word());
    encoded.extend_from_slice(&fee_collector.abi_word());
    encoded
}

/// Keccak-256 of the encoded signal, reduced mod p
pub fn signal_hash(
    pool: &Address,
    public_value: i128,
    fee: u128,
    account: &Address,
    fee_collector: &Address,
) -> Field {
    let digest = CryptoUtils::keccak256(&encode_signal(pool, public_value, fee, account, fee_collector));
    Field::from_be_bytes_mod_order(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_address_parsing() {
        let a: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        assert_eq!(a, addr(0x11));
        assert_eq!(a.to_string(), "0x1111111111111111111111111111111111111111");
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());

        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), a);
    }

    #[test]
    fn test_abi_layout() {
        let encoded = encode_signal(&addr(0xaa), -2, 3, &addr(0xbb), &addr(0xcc));
        assert_eq!(encoded.len(), 5 * WORD);

        // address left-padded
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], &[0xaa; 20]);

        // int256 sign-extended
        assert_eq!(&encoded[32..63], &[0xff; 31]);
        assert_eq!(encoded[63], 0xfe);

        // uint256
        assert_eq!(&encoded[64..95], &[0u8; 31]);
        assert_eq!(encoded[95], 3);
    }

    #[test]
    fn test_signal_binds_every_field() {
        let base = signal_hash(&addr(1), 5, 1, &addr(2), &addr(3));
        assert_eq!(base, signal_hash(&addr(1), 5, 1, &addr(2), &addr(3)));
        assert_ne!(base, signal_hash(&addr(9), 5, 1, &addr(2), &addr(3)));
        assert_ne!(base, signal_hash(&addr(1), -5, 1, &addr(2), &addr(3)));
        assert_ne!(base, signal_hash(&addr(1), 5, 2, &addr(2), &addr(3)));
        assert_ne!(base, signal_hash(&addr(1), 5, 1, &addr(9), &addr(3)));
        assert_ne!(base, signal_hash(&addr(1), 5, 1, &addr(2), &addr(9)));
    }
}
