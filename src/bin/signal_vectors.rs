//! Signal Vector Generator
//! Builds spends against a fresh pool and prints their circuit signals as JSON
//!
//! Usage: signal_vectors [config.json] [count]

use anyhow::{Context, Result};
use privacy_pool_core::crypto::field::to_decimal;
use privacy_pool_core::{Address, Commitment, PoolConfig, PoolState, PrivacyKey, Scalar, SignalAssembler, SpendRequest};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => PoolConfig::from_path(&path).with_context(|| format!("loading config {}", path))?,
        None => PoolConfig::default(),
    };
    let count: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid count {:?}", n))?,
        None => 4,
    };
    log::info!("Generating {} signal vectors (arity {}, max depth {})", count, config.arity, config.max_depth);

    let state = PoolState::new(&config)?;
    let assembler = SignalAssembler::new(config.clone())?;
    let key = PrivacyKey::generate(Some(Scalar::from(0x5eed_u64)))?;

    let pool: Address = "0x2279b7a0a67db372996a5fab50d91eaa73d2ebe6".parse()?;
    let account: Address = "0x5fc8d32690cc91d4c39d9d3abcbd16989f875707".parse()?;
    let fee_collector: Address = "0x0165878a594ca255338adfa4d48449f69242eb8f".parse()?;

    let mut requests = Vec::with_capacity(count);
    for i in 0..count {
        let mut inputs = Vec::with_capacity(config.arity);
        for j in 0..config.arity {
            let mut input = Commitment::new_for(&key, (10 * (i + 1) + j) as i128)?;
            state.insert_commitment(&mut input)?;
            inputs.push(input);
        }

        // alternate shuffle, release and deposit shapes
        let input_total: i128 = inputs.iter().map(|c| i128::from(c.value())).sum();
        let output_total = match i % 3 {
            0 => input_total,
            1 => input_total / 2,
            _ => input_total * 2,
        };
        let mut outputs = vec![Commitment::new_for(&key, output_total)?];
        while outputs.len() < config.arity {
            outputs.push(Commitment::dummy(*key.public_key()));
        }

        requests.push(SpendRequest {
            inputs,
            outputs,
            pool,
            account,
            fee_collector,
            fee_value: (i % 2) as i128,
            membership_proofs: None,
        });
    }

    let vectors = assembler
        .assemble_batch(&state, &key, &requests)
        .into_iter()
        .map(|bundle| {
            let bundle = bundle?;
            Ok(serde_json::json!({
                "public_signals": bundle.public_signals.to_decimal_vec(),
                "private_signals": bundle.private_signals.to_vec().iter().map(to_decimal).collect::<Vec<_>>(),
                "signal_hash": to_decimal(&bundle.signal_hash),
                "public_value": bundle.public_value.to_string(),
                "external_value": bundle.external_value.to_string(),
                "is_release": bundle.is_release,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    println!("{}", serde_json::to_string_pretty(&vectors)?);
    log::info!("Final pool stats: {:?}", state.stats());
    Ok(())
}
