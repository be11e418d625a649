//! Prover gateway
//!
//! Proving and verification run outside this crate (circuit, witness
//! generation, Groth16). The pool only hands signal vectors across this seam
//! and consumes the resulting proof.

use std::str::FromStr;

use ark_bn254::Fq;
use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::privacy::assembler::{PrivateSignals, PublicSignals};

/// External proving and verification capability.
///
/// Calls are blocking from this crate's point of view; async hosts wrap them.
pub trait ProverGateway: Send + Sync {
    fn prove(&self, public: &PublicSignals, private: &PrivateSignals) -> PoolResult<Groth16Proof>;

    fn verify(&self, proof: &Groth16Proof, public: &PublicSignals) -> PoolResult<bool>;
}

/// Groth16 proof over BN254
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Groth16ProofJson", into = "Groth16ProofJson")]
pub struct Groth16Proof {
    pub pi_a: [Fq; 2],
    pub pi_b: [[Fq; 2]; 2],
    pub pi_c: [Fq; 2],
}

impl Groth16Proof {
    /// Solidity verifier calldata order: `pi_b` coordinates are swapped per pair
    pub fn pack(&self) -> [Fq; 8] {
        [
            self.pi_a[0],
            self.pi_a[1],
            self.pi_b[0][1],
            self.pi_b[0][0],
            self.pi_b[1][1],
            self.pi_b[1][0],
            self.pi_c[0],
            self.pi_c[1],
        ]
    }

    /// Packed calldata as decimal strings
    pub fn pack_decimal(&self) -> Vec<String> {
        self.pack().iter().map(fq_to_decimal).collect()
    }
}

/// snarkjs-style JSON shape
#[derive(Serialize, Deserialize)]
struct Groth16ProofJson {
    pi_a: [String; 2],
    pi_b: [[String; 2]; 2],
    pi_c: [String; 2],
}

fn fq_to_decimal(value: &Fq) -> String {
    value.into_bigint().to_string()
}

fn fq_from_decimal(s: &str) -> PoolResult<Fq> {
    Fq::from_str(s).map_err(|_| PoolError::Serialization(format!("invalid base field element: {:?}", s)))
}

impl TryFrom<Groth16ProofJson> for Groth16Proof {
    type Error = PoolError;

    fn try_from(json: Groth16ProofJson) -> Result<Self, Self::Error> {
        let pair = |p: &[String; 2]| -> PoolResult<[Fq; 2]> {
            Ok([fq_from_decimal(&p[0])?, fq_from_decimal(&p[1])?])
        };
        Ok(Self {
            pi_a: pair(&json.pi_a)?,
            pi_b: [pair(&json.pi_b[0])?, pair(&json.pi_b[1])?],
            pi_c: pair(&json.pi_c)?,
        })
    }
}

impl From<Groth16Proof> for Groth16ProofJson {
    fn from(proof: Groth16Proof) -> Self {
        let pair = |p: &[Fq; 2]| [fq_to_decimal(&p[0]), fq_to_decimal(&p[1])];
        Self {
            pi_a: pair(&proof.pi_a),
            pi_b: [pair(&proof.pi_b[0]), pair(&proof.pi_b[1])],
            pi_c: pair(&proof.pi_c),
        }
    }
}
