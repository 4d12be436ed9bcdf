use core::ops::Range;

use anyhow::Result;
use helper_functions::accessors::{
    get_block_root, get_current_epoch, get_previous_epoch, get_total_active_balance,
};
use im::OrdSet;
use types::{
    beacon_state::BeaconState,
    config::Config,
    consts::{GENESIS_EPOCH, JUSTIFICATION_BITS_LENGTH},
    containers::Checkpoint,
    primitives::{Gwei, ValidatorIndex},
};

pub fn process_epoch(config: &Config, state: &mut BeaconState) -> Result<()> {
    process_justification_and_finalization(config, state)?;
    process_participation_record_updates(state);
    Ok(())
}

pub fn process_justification_and_finalization(
    config: &Config,
    state: &mut BeaconState,
) -> Result<()> {
    // > Initial FFG checkpoint values have a `0x00` stub for `root`.
    // > Skip FFG updates in the first two epochs to avoid
    // > corner cases that might result in modifying this stub.
    if get_current_epoch(config, state) <= GENESIS_EPOCH + 1 {
        return Ok(());
    }

    let current_epoch_active_balance = get_total_active_balance(config, state);
    let previous_epoch_target_balance =
        unslashed_balance(state, &state.previous_epoch_target_attesters);
    let current_epoch_target_balance =
        unslashed_balance(state, &state.current_epoch_target_attesters);

    weigh_justification_and_finalization(
        config,
        state,
        current_epoch_active_balance,
        previous_epoch_target_balance,
        current_epoch_target_balance,
    )
}

pub fn weigh_justification_and_finalization(
    config: &Config,
    state: &mut BeaconState,
    current_epoch_active_balance: Gwei,
    previous_epoch_target_balance: Gwei,
    current_epoch_target_balance: Gwei,
) -> Result<()> {
    let previous_epoch = get_previous_epoch(config, state);
    let current_epoch = get_current_epoch(config, state);

    let old_previous_justified_checkpoint = state.previous_justified_checkpoint;
    let old_current_justified_checkpoint = state.current_justified_checkpoint;

    // > Process justifications
    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.justification_bits =
        (state.justification_bits << 1) & bit_mask(0..JUSTIFICATION_BITS_LENGTH);

    if previous_epoch_target_balance * 3 >= current_epoch_active_balance * 2 {
        state.current_justified_checkpoint = Checkpoint {
            epoch: previous_epoch,
            root: get_block_root(config, state, previous_epoch)?,
        };

        state.justification_bits |= bit_mask(1..2);
    }

    if current_epoch_target_balance * 3 >= current_epoch_active_balance * 2 {
        state.current_justified_checkpoint = Checkpoint {
            epoch: current_epoch,
            root: get_block_root(config, state, current_epoch)?,
        };

        state.justification_bits |= bit_mask(0..1);
    }

    // > Process finalizations
    let bits = state.justification_bits;

    // > The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    if all_set(bits, 1..4) && old_previous_justified_checkpoint.epoch + 3 == current_epoch {
        state.finalized_checkpoint = old_previous_justified_checkpoint;
    }

    // > The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    if all_set(bits, 1..3) && old_previous_justified_checkpoint.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_previous_justified_checkpoint;
    }

    // > The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    if all_set(bits, 0..3) && old_current_justified_checkpoint.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_current_justified_checkpoint;
    }

    // > The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    if all_set(bits, 0..2) && old_current_justified_checkpoint.epoch + 1 == current_epoch {
        state.finalized_checkpoint = old_current_justified_checkpoint;
    }

    Ok(())
}

fn process_participation_record_updates(state: &mut BeaconState) {
    state.previous_epoch_target_attesters =
        core::mem::take(&mut state.current_epoch_target_attesters);
}

fn unslashed_balance(state: &BeaconState, attesters: &OrdSet<ValidatorIndex>) -> Gwei {
    attesters
        .iter()
        .filter_map(|index| usize::try_from(*index).ok())
        .filter_map(|position| state.validators.get(position))
        .filter(|validator| !validator.slashed)
        .map(|validator| validator.effective_balance)
        .sum()
}

const fn bit_mask(bits: Range<u32>) -> u8 {
    ((1 << bits.end) - 1) & !((1 << bits.start) - 1)
}

const fn all_set(bits: u8, range: Range<u32>) -> bool {
    let mask = bit_mask(range);
    bits & mask == mask
}
