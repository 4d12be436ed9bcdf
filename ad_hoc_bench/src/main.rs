use std::{sync::Arc, time::Instant};

use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use fork_choice_control::AdHocBenchController;
use fork_choice_store::StoreConfig;
use helper_functions::verifier::{DigestVerifier, NullVerifier, Verifier};
use log::info;
use prometheus::TextEncoder;
use prometheus_metrics::Metrics;
use rand::{rngs::StdRng, seq::SliceRandom as _, SeedableRng as _};
use types::{
    config::Config as ChainConfig,
    primitives::{Slot, H256},
    traits::SszHash as _,
};

#[derive(Clone, Copy, Parser)]
struct Options {
    #[clap(value_enum)]
    chain: Chain,
    #[clap(value_enum)]
    order: Order,
    #[clap(value_enum)]
    mode: Mode,
    /// Number of slots to build blocks for, not including genesis.
    #[clap(long, default_value_t = 256)]
    slots: Slot,
    #[clap(long, default_value_t = factory::MIN_GENESIS_ACTIVE_VALIDATOR_COUNT)]
    validators: u64,
    /// Seed for `Order::Shuffle`.
    #[clap(long, default_value_t = 0)]
    seed: u64,
    /// Skip signature verification.
    #[clap(long)]
    no_signatures: bool,
    #[clap(long)]
    no_confirmation: bool,
    /// Register metrics with the default Prometheus registry and print them when done.
    #[clap(long)]
    metrics: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Chain {
    Mainnet,
    Minimal,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Forward,
    Reverse,
    Shuffle,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Asynchronous,
    Synchronous,
}

impl From<Chain> for ChainConfig {
    fn from(chain: Chain) -> Self {
        match chain {
            Chain::Mainnet => Self::mainnet(),
            Chain::Minimal => Self::minimal(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    run(Options::parse())
}

#[expect(clippy::cast_precision_loss)]
#[expect(clippy::float_arithmetic)]
fn run(options: Options) -> Result<()> {
    let Options {
        chain,
        order,
        mode,
        slots,
        validators,
        seed,
        no_signatures,
        no_confirmation,
        metrics,
    } = options;

    ensure!(slots > 0, "at least one slot is needed to build a chain");

    let chain_config = Arc::new(ChainConfig::from(chain));
    let genesis_state = factory::genesis_state(&chain_config, validators);
    let genesis_block = factory::genesis_block(&genesis_state);

    info!("building {slots} blocks with {validators} validators");

    let mut blocks = Vec::new();
    let mut state = Arc::clone(&genesis_state);

    for slot in 1..=slots {
        let (block, post_state) = factory::full_block(&chain_config, state, slot, H256::zero())?;
        blocks.push(block);
        state = post_state;
    }

    let last_block_root = blocks
        .last()
        .map(|block| block.message.hash_tree_root())
        .unwrap_or_default();

    let verifier: Arc<dyn Verifier> = if no_signatures {
        Arc::new(NullVerifier)
    } else {
        Arc::new(DigestVerifier)
    };

    let store_config = StoreConfig {
        confirmation_rule: !no_confirmation,
        ..StoreConfig::default()
    };

    let metrics = if metrics {
        let metrics = Arc::new(Metrics::new()?);
        metrics.register_with_default_metrics()?;
        Some(metrics)
    } else {
        None
    };

    let (controller, mutator_handle) = AdHocBenchController::with_reference_transition(
        Arc::clone(&chain_config),
        store_config,
        verifier,
        genesis_block,
        genesis_state,
        metrics.clone(),
        futures::sink::drain(),
    )?;

    controller.on_slot(slots);
    controller.wait_for_tasks();

    match order {
        Order::Forward => {}
        Order::Reverse => blocks.reverse(),
        Order::Shuffle => blocks.shuffle(&mut StdRng::seed_from_u64(seed)),
    }

    let block_count = blocks.len();

    info!("processing {block_count} blocks in {slots} slots (not including genesis)");

    let start = Instant::now();

    for block in blocks {
        controller.on_block(block);

        if mode == Mode::Synchronous {
            controller.wait_for_tasks();
        }
    }

    if mode == Mode::Asynchronous {
        controller.wait_for_tasks();
    }

    let time = start.elapsed().as_secs_f64();

    let head = controller.head();
    ensure!(head.block_root == last_block_root, "head should be the last block");
    ensure!(head.slot() == slots, "head should be in the last slot");

    let time_per_block = time / block_count as f64;
    let block_throughput = time_per_block.recip();

    info!("blocks processed:         {block_count}");
    info!("time taken:               {time:.3} s");
    info!(
        "average time per block:   {:.3} ms",
        time_per_block * 1000_f64,
    );
    info!("average block throughput: {block_throughput:.3} blocks/s");
    info!("justified checkpoint:     {:?}", controller.justified_checkpoint());
    info!("finalized checkpoint:     {:?}", controller.finalized_checkpoint());
    info!("confirmed block:          {:?}", controller.confirmed_root());

    if metrics.is_some() {
        let text = TextEncoder::new().encode_to_string(&prometheus::gather())?;
        info!("metrics:\n{text}");
    }

    drop(controller);

    mutator_handle.join()
}
