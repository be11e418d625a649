//! Pool state: accumulator and nullifier set
//!
//! Both live behind one `RwLock`. Writers (`insert`, `try_spend`,
//! `apply_transition`) are serialized, so leaf indices are gap-free and a
//! nullifier can only be spent once. Readers share the lock and always see a
//! consistent root/nullifier pair.

use parking_lot::RwLock;

use crate::config::PoolConfig;
use crate::crypto::Field;
use crate::error::{PoolError, PoolResult};
use crate::merkle::{Accumulator, MembershipProof};
use crate::privacy::assembler::SignalBundle;
use crate::privacy::nullifier_set::NullifierSet;
use crate::privacy::prover::{Groth16Proof, ProverGateway};
use crate::privacy::types::{PoolStats, TransitionOutcome};
use crate::utxo::Commitment;

struct StateInner {
    accumulator: Accumulator,
    nullifiers: NullifierSet,
}

/// Shared pool state
pub struct PoolState {
    inner: RwLock<StateInner>,
}

impl PoolState {
    pub fn new(config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: RwLock::new(StateInner {
                accumulator: Accumulator::new(config.max_depth)?,
                nullifiers: NullifierSet::new(),
            }),
        })
    }

    /// Run `f` against one consistent snapshot of the state
    pub fn read<R>(&self, f: impl FnOnce(&Accumulator, &NullifierSet) -> R) -> R {
        let inner = self.inner.read();
        f(&inner.accumulator, &inner.nullifiers)
    }

    /// Append a leaf hash
    pub fn insert(&self, leaf: Field) -> PoolResult<u64> {
        let index = self.inner.write().accumulator.insert(leaf)?;
        log::info!("Inserted leaf {} at index {}", leaf, index);
        Ok(index)
    }

    /// Insert a commitment and record its index on it
    pub fn insert_commitment(&self, commitment: &mut Commitment) -> PoolResult<u64> {
        if commitment.is_dummy() {
            return Err(PoolError::InvalidInput(
                "dummy commitments are never inserted".to_string(),
            ));
        }
        if let Some(existing) = commitment.index() {
            return Err(PoolError::AlreadyInserted(existing));
        }

        let index = self.insert(commitment.hash())?;
        commitment.set_index(index)?;
        Ok(index)
    }

    /// Record a nullifier; `false` when it was already spent
    pub fn try_spend(&self, nullifier: Field) -> bool {
        let spent = self.inner.write().nullifiers.try_spend(nullifier);
        if spent {
            log::info!("Spent nullifier {}", nullifier);
        } else {
            log::warn!("Rejected double spend of nullifier {}", nullifier);
        }
        spent
    }

    pub fn is_spent(&self, nullifier: &Field) -> bool {
        self.inner.read().nullifiers.contains(nullifier)
    }

    pub fn prove_membership(&self, index: u64) -> PoolResult<MembershipProof> {
        self.inner.read().accumulator.prove(index)
    }

    pub fn current_root(&self) -> Field {
        self.inner.read().accumulator.root()
    }

    pub fn index_of(&self, leaf: &Field) -> Option<u64> {
        self.inner.read().accumulator.index_of(leaf)
    }

    /// Reject a proof whose root is not the current root
    pub fn check_fresh(&self, proof: &MembershipProof) -> PoolResult<()> {
        check_fresh(&self.inner.read().accumulator, proof)
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.read();
        PoolStats {
            merkle_root: inner.accumulator.root(),
            size: inner.accumulator.leaf_count(),
            capacity: inner.accumulator.capacity(),
            depth: inner.accumulator.depth(),
            nullifier_count: inner.nullifiers.len(),
        }
    }

    /// Apply an accepted spend: spend every real input nullifier and insert
    /// every real output, or change nothing.
    pub fn apply_transition(&self, bundle: &SignalBundle) -> PoolResult<TransitionOutcome> {
        let nullifiers = bundle.real_input_nullifiers();
        let outputs = bundle.real_output_hashes();

        let mut inner = self.inner.write();
        let StateInner {
            accumulator,
            nullifiers: spent,
        } = &mut *inner;

        if accumulator.leaf_count() + outputs.len() as u64 > accumulator.capacity() {
            return Err(PoolError::CapacityExceeded {
                max_depth: accumulator.max_depth(),
            });
        }
        if let Err(conflict) = spent.try_spend_all(&nullifiers) {
            log::warn!("Rejected transition: nullifier {} already spent", conflict);
            return Ok(TransitionOutcome::DoubleSpend(conflict));
        }

        let output_indices = accumulator.insert_many(&outputs)?;
        log::info!(
            "Applied transition: {} nullifiers spent, {} outputs inserted, root {}",
            nullifiers.len(),
            output_indices.len(),
            accumulator.root()
        );
        Ok(TransitionOutcome::Applied { output_indices })
    }

    /// Verify `proof` through the gateway and apply the spend only if accepted
    pub fn settle(
        &self,
        gateway: &dyn ProverGateway,
        bundle: &SignalBundle,
        proof: &Groth16Proof,
    ) -> PoolResult<TransitionOutcome> {
        if !gateway.verify(proof, &bundle.public_signals)? {
            log::warn!("Prover gateway rejected proof for signal {}", bundle.signal_hash);
            return Ok(TransitionOutcome::ProofRejected);
        }
        self.apply_transition(bundle)
    }
}

pub(crate) fn check_fresh(accumulator: &Accumulator, proof: &MembershipProof) -> PoolResult<()> {
    let current_root = accumulator.root();
    if proof.root != current_root {
        log::warn!(
            "Stale membership proof for leaf {}: root {} is no longer current",
            proof.leaf_index,
            proof.root
        );
        return Err(PoolError::StaleProof {
            leaf_index: proof.leaf_index,
            proof_root: proof.root,
            current_root,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{PrivacyKey, Scalar};

    fn state() -> PoolState {
        PoolState::new(&PoolConfig::default()).unwrap()
    }

    fn key() -> PrivacyKey {
        PrivacyKey::generate(Some(Scalar::from(21u64))).unwrap()
    }

    #[test]
    fn test_insert_commitment() {
        let state = state();
        let k = key();
        let mut a = Commitment::new_for(&k, 10).unwrap();
        let mut b = Commitment::new_for(&k, 20).unwrap();

        assert_eq!(state.insert_commitment(&mut a).unwrap(), 0);
        assert_eq!(state.insert_commitment(&mut b).unwrap(), 1);
        assert_eq!(b.index(), Some(1));
        assert_eq!(state.index_of(&b.hash()), Some(1));
        assert_eq!(state.insert_commitment(&mut a), Err(PoolError::AlreadyInserted(0)));

        let mut dummy = Commitment::dummy(*k.public_key());
        assert!(state.insert_commitment(&mut dummy).is_err());
        assert_eq!(dummy.index(), None);
        assert_eq!(state.stats().size, 2);
    }

    #[test]
    fn test_try_spend() {
        let state = state();
        let n = Field::from(5u64);
        assert!(!state.is_spent(&n));
        assert!(state.try_spend(n));
        assert!(state.is_spent(&n));
        assert!(!state.try_spend(n));
        assert_eq!(state.stats().nullifier_count, 1);
    }

    #[test]
    fn test_check_fresh() {
        let state = state();
        state.insert(Field::from(1u64)).unwrap();
        let proof = state.prove_membership(0).unwrap();
        assert!(state.check_fresh(&proof).is_ok());

        state.insert(Field::from(2u64)).unwrap();
        assert!(matches!(
            state.check_fresh(&proof),
            Err(PoolError::StaleProof { leaf_index: 0, .. })
        ));
        assert!(state.check_fresh(&state.prove_membership(0).unwrap()).is_ok());
    }

    #[test]
    fn test_concurrent_spend_single_winner() {
        use std::sync::Arc;

        let state = Arc::new(state());
        let n = Field::from(1234u64);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.try_spend(n))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
