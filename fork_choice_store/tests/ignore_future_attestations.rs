// Features are process-wide and cannot be disabled, so this runs in its own test binary.

// The `unused_crate_dependencies` lint checks every crate in a package separately.
// See <https://github.com/rust-lang/rust/issues/57274>.
#![allow(unused_crate_dependencies)]

use std::sync::Arc;

use anyhow::Result;
use features::Feature;
use fork_choice_store::{AttestationOrigin, Store, StoreConfig};
use helper_functions::verifier::DigestVerifier;
use transition_functions::{Phase0Transition, StateRootPolicy};
use types::{config::Config, primitives::H256, traits::SszHash as _};

#[test]
fn future_attestations_are_dropped_instead_of_delayed() -> Result<()> {
    Feature::IgnoreFutureAttestations.enable();

    let config = Arc::new(Config::minimal());
    let genesis_state = factory::min_genesis_state(&config);

    let mut store = Store::new(
        Arc::clone(&config),
        StoreConfig::default(),
        Arc::new(Phase0Transition::new(Arc::clone(&config), StateRootPolicy::Verify)),
        Arc::new(DigestVerifier),
        factory::genesis_block(&genesis_state),
        Arc::clone(&genesis_state),
    )?;

    let (block_1, state_1) = factory::empty_block(&config, genesis_state, 1, H256::zero())?;
    let root_1 = block_1.message.hash_tree_root();

    store.on_tick(factory::GENESIS_TIME + config.seconds_per_slot.get())?;
    store.on_block(&block_1)?;

    // The attestation could only be applied in slot 2.
    let attestation = factory::attestation(&config, &state_1, root_1, 1, vec![4])?;

    store.on_attestation(&attestation, AttestationOrigin::Gossip)?;

    assert_eq!(store.latest_message(4), None);
    assert_eq!(store.weight(root_1), store.proposer_score());

    Ok(())
}
