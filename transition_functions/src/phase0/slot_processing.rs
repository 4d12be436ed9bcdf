use anyhow::{ensure, Result};
use helper_functions::misc;
use types::{beacon_state::BeaconState, config::Config, primitives::Slot, traits::SszHash as _};

use crate::{error::Error, phase0::epoch_processing};

pub fn process_slots(config: &Config, state: &mut BeaconState, slot: Slot) -> Result<()> {
    ensure!(
        state.slot < slot,
        Error::SlotNotLater {
            current: state.slot,
            target: slot,
        },
    );

    while state.slot < slot {
        process_slot(state);

        // > Process epoch on the start slot of the next epoch
        if misc::is_epoch_start(config, state.slot + 1) {
            epoch_processing::process_epoch(config, state)?;
        }

        state.slot += 1;
    }

    Ok(())
}

pub fn process_slot(state: &mut BeaconState) {
    let previous_state_root = state.hash_tree_root();

    // > Cache latest block header state root
    if state.latest_block_header.state_root.is_zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    // > Cache block root
    //
    // Block roots are never overwritten, so the root for `state.slot` always goes at the end.
    let previous_block_root = state.latest_block_header.hash_tree_root();
    state.block_roots.push_back(previous_block_root);
}
