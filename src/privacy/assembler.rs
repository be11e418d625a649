//! Signal assembler
//!
//! Turns `K` input and `K` output commitments into the ordered public and
//! private signal vectors the spend circuit consumes.
//!
//! Public signals, in order:
//!
//! | offset   | signal                         |
//! |----------|--------------------------------|
//! | `0..K`   | input nullifiers               |
//! | `K..2K`  | output commitment hashes       |
//! | `2K`     | scope                          |
//! | `2K+1`   | actual tree depth              |
//! | `2K+2`   | signal hash                    |
//! | `2K+3`   | external value (signed, mod p) |
//! | `2K+4`   | state root                     |
//!
//! Private signals, in order: input public keys (`x, y` per input), input
//! values, input salts, signature `R8` (`x, y` per input), signature `S`,
//! leaf indices, Merkle siblings (`MAX_DEPTH` per input), output public keys,
//! output values, output salts.
//!
//! Assembly never mutates pool state. Spending the nullifiers and inserting
//! the outputs happens through `PoolState::apply_transition` once a proof
//! has been accepted.

use std::collections::HashSet;

use ark_ff::Zero;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::PoolConfig;
use crate::crypto::field::{decimal, decimal_matrix, decimal_vec, from_signed, to_decimal};
use crate::crypto::{Field, PrivacyKey, PublicKey, Signature};
use crate::error::{PoolError, PoolResult};
use crate::merkle::{Accumulator, MembershipProof};
use crate::privacy::nullifier_set::NullifierSet;
use crate::privacy::signal::{signal_hash, Address};
use crate::privacy::state::{check_fresh, PoolState};
use crate::utxo::Commitment;

/// A spend to assemble
#[derive(Debug, Clone)]
pub struct SpendRequest {
    pub inputs: Vec<Commitment>,
    pub outputs: Vec<Commitment>,
    pub pool: Address,
    pub account: Address,
    pub fee_collector: Address,
    pub fee_value: i128,
    /// Proofs for each input, in input order; fetched from state when absent
    pub membership_proofs: Option<Vec<MembershipProof>>,
}

/// Circuit-public signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSignals {
    #[serde(with = "decimal_vec")]
    pub nullifiers: Vec<Field>,
    #[serde(with = "decimal_vec")]
    pub output_commitments: Vec<Field>,
    #[serde(with = "decimal")]
    pub scope: Field,
    pub tree_depth: usize,
    #[serde(with = "decimal")]
    pub signal_hash: Field,
    #[serde(with = "decimal")]
    pub external_value: Field,
    #[serde(with = "decimal")]
    pub state_root: Field,
}

impl PublicSignals {
    /// Flatten in circuit order
    pub fn to_vec(&self) -> Vec<Field> {
        let mut signals = Vec::with_capacity(self.nullifiers.len() + self.output_commitments.len() + 5);
        signals.extend_from_slice(&self.nullifiers);
        signals.extend_from_slice(&self.output_commitments);
        signals.push(self.scope);
        signals.push(Field::from(self.tree_depth as u64));
        signals.push(self.signal_hash);
        signals.push(self.external_value);
        signals.push(self.state_root);
        signals
    }

    /// Flattened signals as decimal strings
    pub fn to_decimal_vec(&self) -> Vec<String> {
        self.to_vec().iter().map(to_decimal).collect()
    }
}

/// Circuit-private signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateSignals {
    pub input_public_keys: Vec<PublicKey>,
    pub input_values: Vec<u64>,
    #[serde(with = "decimal_vec")]
    pub input_salts: Vec<Field>,
    pub input_signatures: Vec<Signature>,
    pub leaf_indices: Vec<u64>,
    #[serde(with = "decimal_matrix")]
    pub siblings: Vec<Vec<Field>>,
    pub output_public_keys: Vec<PublicKey>,
    pub output_values: Vec<u64>,
    #[serde(with = "decimal_vec")]
    pub output_salts: Vec<Field>,
}

impl PrivateSignals {
    /// Flatten in circuit order
    pub fn to_vec(&self) -> Vec<Field> {
        let mut signals = Vec::new();
        for key in &self.input_public_keys {
            signals.push(key.x());
            signals.push(key.y());
        }
        signals.extend(self.input_values.iter().map(|v| Field::from(*v)));
        signals.extend_from_slice(&self.input_salts);
        for signature in &self.input_signatures {
            let [r8_x, r8_y, _] = signature.as_fields();
            signals.push(r8_x);
            signals.push(r8_y);
        }
        signals.extend(self.input_signatures.iter().map(|s| s.as_fields()[2]));
        signals.extend(self.leaf_indices.iter().map(|i| Field::from(*i)));
        for path in &self.siblings {
            signals.extend_from_slice(path);
        }
        for key in &self.output_public_keys {
            signals.push(key.x());
            signals.push(key.y());
        }
        signals.extend(self.output_values.iter().map(|v| Field::from(*v)));
        signals.extend_from_slice(&self.output_salts);
        signals
    }
}

/// Assembled spend, ready for the prover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub public_signals: PublicSignals,
    pub private_signals: PrivateSignals,
    #[serde(with = "decimal")]
    pub signal_hash: Field,
    /// `sum(outputs) - sum(inputs)`
    pub public_value: i128,
    /// `public_value + fee`
    pub external_value: i128,
    pub is_release: bool,
}

impl SignalBundle {
    /// Nullifiers of the non-dummy inputs
    pub fn real_input_nullifiers(&self) -> Vec<Field> {
        let private = &self.private_signals;
        self.public_signals
            .nullifiers
            .iter()
            .zip(private.input_values.iter().zip(&private.input_salts))
            .filter(|(_, (value, salt))| !is_dummy(**value, salt))
            .map(|(nullifier, _)| *nullifier)
            .collect()
    }

    /// Hashes of the non-dummy outputs
    pub fn real_output_hashes(&self) -> Vec<Field> {
        let private = &self.private_signals;
        self.public_signals
            .output_commitments
            .iter()
            .zip(private.output_values.iter().zip(&private.output_salts))
            .filter(|(_, (value, salt))| !is_dummy(**value, salt))
            .map(|(hash, _)| *hash)
            .collect()
    }

    pub fn to_json(&self) -> PoolResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PoolError::Serialization(e.to_string()))
    }
}

fn is_dummy(value: u64, salt: &Field) -> bool {
    value == 0 && salt.is_zero()
}

/// Per-input material gathered under the state read lock
struct InputWitness {
    nullifier: Field,
    signature: Signature,
    message: Field,
    leaf_index: u64,
    siblings: Vec<Field>,
}

/// Builds signal bundles for a fixed arity and tree depth
#[derive(Debug, Clone)]
pub struct SignalAssembler {
    config: PoolConfig,
}

impl SignalAssembler {
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Validate `request` against `state` and assemble its signals
    pub fn assemble(
        &self,
        state: &PoolState,
        key: &PrivacyKey,
        request: &SpendRequest,
    ) -> PoolResult<SignalBundle> {
        let arity = self.config.arity;
        if request.inputs.len() != arity || request.outputs.len() != arity {
            return Err(PoolError::ArityMismatch {
                expected: arity,
                inputs: request.inputs.len(),
                outputs: request.outputs.len(),
            });
        }
        if request.fee_value < 0 {
            return Err(PoolError::NegativeValue(request.fee_value));
        }
        for (position, input) in request.inputs.iter().enumerate() {
            if !input.is_dummy() && input.owner() != key.public_key() {
                return Err(PoolError::UnspendableInput {
                    position,
                    reason: "owned by a different key".to_string(),
                });
            }
        }

        let (witnesses, tree_depth, state_root) = state.read(|accumulator, nullifiers| -> PoolResult<_> {
            let witnesses = self.collect_witnesses(accumulator, nullifiers, key, request)?;
            Ok((witnesses, accumulator.depth(), accumulator.root()))
        })?;

        for (position, (input, witness)) in request.inputs.iter().zip(&witnesses).enumerate() {
            if !input.is_dummy() && !key.verify(&witness.signature, witness.message) {
                return Err(PoolError::SigningError(format!(
                    "signature for input {} does not verify",
                    position
                )));
            }
        }

        let input_sum: i128 = request.inputs.iter().map(|c| i128::from(c.value())).sum();
        let output_sum: i128 = request.outputs.iter().map(|c| i128::from(c.value())).sum();
        let public_value = output_sum - input_sum;
        let external_value = public_value
            .checked_add(request.fee_value)
            .ok_or(PoolError::ValueOutOfRange(request.fee_value))?;
        let fee = u128::try_from(request.fee_value)
            .map_err(|_| PoolError::NegativeValue(request.fee_value))?;
        let signal = signal_hash(
            &request.pool,
            public_value,
            fee,
            &request.account,
            &request.fee_collector,
        );

        log::debug!(
            "Assembled spend: public value {}, external value {}, signal {}",
            public_value,
            external_value,
            signal
        );

        let public_signals = PublicSignals {
            nullifiers: witnesses.iter().map(|w| w.nullifier).collect(),
            output_commitments: request.outputs.iter().map(Commitment::hash).collect(),
            scope: self.config.scope,
            tree_depth,
            signal_hash: signal,
            external_value: from_signed(external_value),
            state_root,
        };

        let private_signals = PrivateSignals {
            input_public_keys: request.inputs.iter().map(|c| *c.owner()).collect(),
            input_values: request.inputs.iter().map(Commitment::value).collect(),
            input_salts: request.inputs.iter().map(Commitment::salt).collect(),
            input_signatures: witnesses.iter().map(|w| w.signature).collect(),
            leaf_indices: witnesses.iter().map(|w| w.leaf_index).collect(),
            siblings: witnesses.into_iter().map(|w| w.siblings).collect(),
            output_public_keys: request.outputs.iter().map(|c| *c.owner()).collect(),
            output_values: request.outputs.iter().map(Commitment::value).collect(),
            output_salts: request.outputs.iter().map(Commitment::salt).collect(),
        };

        Ok(SignalBundle {
            public_signals,
            private_signals,
            signal_hash: signal,
            public_value,
            external_value,
            is_release: public_value < 0,
        })
    }

    /// Assemble independent requests in parallel; results keep request order
    pub fn assemble_batch(
        &self,
        state: &PoolState,
        key: &PrivacyKey,
        requests: &[SpendRequest],
    ) -> Vec<PoolResult<SignalBundle>> {
        requests
            .par_iter()
            .map(|request| self.assemble(state, key, request))
            .collect()
    }

    fn collect_witnesses(
        &self,
        accumulator: &Accumulator,
        nullifiers: &NullifierSet,
        key: &PrivacyKey,
        request: &SpendRequest,
    ) -> PoolResult<Vec<InputWitness>> {
        if let Some(proofs) = &request.membership_proofs {
            if proofs.len() != request.inputs.len() {
                return Err(PoolError::InvalidInput(format!(
                    "expected {} membership proofs, got {}",
                    request.inputs.len(),
                    proofs.len()
                )));
            }
        }

        let mut witnesses = Vec::with_capacity(request.inputs.len());
        let mut seen = HashSet::with_capacity(request.inputs.len());
        for (position, input) in request.inputs.iter().enumerate() {
            if input.is_dummy() {
                let (signature, nullifier) = input.nullifier(key)?;
                witnesses.push(InputWitness {
                    nullifier,
                    signature,
                    message: input.signature_message()?,
                    leaf_index: 0,
                    siblings: MembershipProof::zero(self.config.max_depth).siblings,
                });
                continue;
            }

            let unspendable = |reason: &str| PoolError::UnspendableInput {
                position,
                reason: reason.to_string(),
            };
            let index = input.index().ok_or_else(|| unspendable("not inserted"))?;
            if accumulator.leaves().get(index as usize) != Some(&input.hash()) {
                return Err(unspendable("not present in the accumulator at its index"));
            }

            let message = input.signature_message()?;
            let (signature, nullifier) = input.nullifier(key)?;
            if nullifiers.contains(&nullifier) {
                log::warn!("Input {} nullifier {} is already spent", position, nullifier);
                return Err(unspendable("already spent"));
            }
            if !seen.insert(nullifier) {
                log::warn!("Input {} repeats nullifier {}", position, nullifier);
                return Err(unspendable("duplicate input"));
            }

            witnesses.push(InputWitness {
                nullifier,
                signature,
                message,
                leaf_index: index,
                siblings: Vec::new(),
            });
        }

        for (position, output) in request.outputs.iter().enumerate() {
            if let Some(index) = output.index() {
                log::warn!("Output {} is already inserted at {}", position, index);
                return Err(PoolError::AlreadyInserted(index));
            }
        }

        for (position, (input, witness)) in request.inputs.iter().zip(witnesses.iter_mut()).enumerate() {
            if input.is_dummy() {
                continue;
            }
            let proof = match &request.membership_proofs {
                Some(proofs) => {
                    let proof = &proofs[position];
                    if proof.leaf_index != witness.leaf_index || !proof.verify(&input.hash()) {
                        return Err(PoolError::InvalidInput(format!(
                            "membership proof {} does not open input {}",
                            position, position
                        )));
                    }
                    check_fresh(accumulator, proof)?;
                    proof.clone()
                }
                None => accumulator.prove(witness.leaf_index)?,
            };
            witness.siblings = proof.siblings;
        }

        Ok(witnesses)
    }
}
