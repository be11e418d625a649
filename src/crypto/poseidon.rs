//! Poseidon Hash Implementation
//!
//! Fixed-arity Poseidon over the BN254 scalar field. Every commitment,
//! nullifier, signature challenge and Merkle node in the pool goes through
//! `PoseidonHasher::hash2`, `hash4` or `hash5`.
//!
//! The arity is absorbed as the first element so the three functions are
//! domain separated from each other.

use std::sync::OnceLock;

use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::{MontFp, PrimeField};
use blake2::{Blake2s256, Digest};

use crate::crypto::{domains, Field};

/// Number of full rounds (beginning + end)
const FULL_ROUNDS: usize = 8;

/// Number of partial rounds
const PARTIAL_ROUNDS: usize = 57;

/// S-box exponent
const ALPHA: u64 = 5;

/// Sponge width (rate 2 + capacity 1)
const WIDTH: usize = 3;

static CONFIG: OnceLock<PoseidonConfig<Field>> = OnceLock::new();

/// Shared Poseidon parameters, built on first use
pub fn poseidon_config() -> &'static PoseidonConfig<Field> {
    CONFIG.get_or_init(build_config)
}

fn build_config() -> PoseidonConfig<Field> {
    let mds: Vec<Vec<Field>> = vec![
        vec![
            MontFp!("7511745149465107256748700652201246547602992235352608707588321460060273774987"),
            MontFp!("10370080108974718697676803824769673834027675643658433702224577712625900127200"),
            MontFp!("19705173408229649878903981084052839426532978878058043055305024233888854471533"),
        ],
        vec![
            MontFp!("18732019378264290557468133440468564866454307626475683536618613112504878618481"),
            MontFp!("20870176810702568768751421378473869562658540583882454726129544628203806653987"),
            MontFp!("7266061498423634438932006217945904744987532209093972706694887950396501989428"),
        ],
        vec![
            MontFp!("9131299761947733513298312097611845208338517739621853568979632113419485819303"),
            MontFp!("10595341252162738537912664445405114076324478519622938027420701542910180337937"),
            MontFp!("11597556804922396090267472882856054602429588299176362916247939723151043581408"),
        ],
    ];

    PoseidonConfig {
        full_rounds: FULL_ROUNDS,
        partial_rounds: PARTIAL_ROUNDS,
        alpha: ALPHA,
        ark: round_constants(),
        mds,
        rate: 2,
        capacity: 1,
    }
}

/// Round constants derived from Blake2s under the pool's Poseidon domain
fn round_constants() -> Vec<Vec<Field>> {
    (0..FULL_ROUNDS + PARTIAL_ROUNDS)
        .map(|round| {
            (0..WIDTH)
                .map(|lane| {
                    let mut hasher = Blake2s256::new();
                    hasher.update(domains::DOMAIN_POSEIDON);
                    hasher.update((round as u32).to_le_bytes());
                    hasher.update((lane as u32).to_le_bytes());
                    Field::from_le_bytes_mod_order(&hasher.finalize())
                })
                .collect()
        })
        .collect()
}

/// Poseidon hash for the pool's fixed arities
pub struct PoseidonHasher;

impl PoseidonHasher {
    /// H2, the Merkle node combinator and public key hash
    pub fn hash2(left: Field, right: Field) -> Field {
        Self::hash_fixed(&[left, right])
    }

    /// H4, commitment hash and signature message
    pub fn hash4(inputs: [Field; 4]) -> Field {
        Self::hash_fixed(&inputs)
    }

    /// H5, nullifier and signature challenge
    pub fn hash5(inputs: [Field; 5]) -> Field {
        Self::hash_fixed(&inputs)
    }

    fn hash_fixed<const N: usize>(inputs: &[Field; N]) -> Field {
        let mut sponge = PoseidonSponge::new(poseidon_config());
        sponge.absorb(&Field::from(N as u64));
        for input in inputs {
            sponge.absorb(input);
        }
        sponge.squeeze_field_elements::<Field>(1)[0]
    }
}
