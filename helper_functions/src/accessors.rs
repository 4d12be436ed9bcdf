use anyhow::{ensure, Result};
use itertools::{EitherOrBoth, Itertools as _};
use types::{
    beacon_state::BeaconState,
    config::Config,
    consts::GENESIS_EPOCH,
    containers::AttesterSlashing,
    primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256},
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub const fn get_current_epoch(config: &Config, state: &BeaconState) -> Epoch {
    misc::compute_epoch_at_slot(config, state.slot)
}

#[must_use]
pub fn get_previous_epoch(config: &Config, state: &BeaconState) -> Epoch {
    get_current_epoch(config, state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

pub fn get_block_root_at_slot(state: &BeaconState, slot: Slot) -> Result<H256> {
    ensure!(slot < state.slot, Error::SlotOutOfRange { slot });

    let index = usize::try_from(slot)?;

    state
        .block_roots
        .get(index)
        .copied()
        .ok_or_else(|| Error::SlotOutOfRange { slot }.into())
}

/// Root of the block at the start of `epoch`, or of the last block preceding it.
pub fn get_block_root(config: &Config, state: &BeaconState, epoch: Epoch) -> Result<H256> {
    get_block_root_at_slot(state, misc::compute_start_slot_at_epoch(config, epoch))
}

pub fn active_validator_indices(
    state: &BeaconState,
    epoch: Epoch,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    (0..)
        .zip(&state.validators)
        .filter(move |(_, validator)| predicates::is_active_validator(validator, epoch))
        .map(|(index, _)| index)
}

/// Proposers take turns in the order of the active validator registry.
///
/// There is no RANDAO in this chain, so the schedule is fully predictable.
pub fn get_beacon_proposer_index(config: &Config, state: &BeaconState) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch(config, state);
    let active = active_validator_indices(state, epoch).collect::<Vec<_>>();

    ensure!(!active.is_empty(), Error::NoActiveValidators);

    let position = usize::try_from(state.slot % active.len() as u64)?;

    Ok(active[position])
}

/// Indices present in both attestations of `attester_slashing`, in ascending order.
///
/// Both index lists must be sorted for the result to be complete.
pub fn slashable_indices(
    attester_slashing: &AttesterSlashing,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    attester_slashing
        .attestation_1
        .attesting_indices
        .iter()
        .merge_join_by(
            &attester_slashing.attestation_2.attesting_indices,
            |index_1, index_2| index_1.cmp(index_2),
        )
        .filter_map(|either_or_both| match either_or_both {
            EitherOrBoth::Both(index, _) => Some(*index),
            EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => None,
        })
}

pub fn total_balance(
    state: &BeaconState,
    indices: impl IntoIterator<Item = ValidatorIndex>,
) -> Result<Gwei> {
    indices.into_iter().try_fold(0, |total: Gwei, index| {
        let validator = usize::try_from(index)
            .ok()
            .and_then(|position| state.validators.get(position))
            .ok_or(Error::ValidatorNotFound { index })?;

        Ok(total + validator.effective_balance)
    })
}

#[must_use]
pub fn get_total_active_balance(config: &Config, state: &BeaconState) -> Gwei {
    let epoch = get_current_epoch(config, state);

    state
        .validators
        .iter()
        .filter(|validator| predicates::is_active_validator(validator, epoch))
        .map(|validator| validator.effective_balance)
        .sum()
}

/// Effective balances of all validators, zeroed for those that are inactive or slashed.
///
/// Fork choice weighs votes with these. Indexing by validator is cheaper than looking each
/// validator up in the registry.
#[must_use]
pub fn get_active_balances(config: &Config, state: &BeaconState) -> Vec<Gwei> {
    let epoch = get_current_epoch(config, state);

    state
        .validators
        .iter()
        .map(|validator| {
            if predicates::is_active_validator(validator, epoch) && !validator.slashed {
                validator.effective_balance
            } else {
                0
            }
        })
        .collect()
}
