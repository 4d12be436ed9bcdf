use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{
        get_beacon_proposer_index, get_block_root, get_current_epoch, get_previous_epoch,
        slashable_indices,
    },
    error::SignatureKind,
    misc::compute_epoch_at_slot,
    predicates::{
        attesting_public_keys, is_slashable_attestation_data, is_slashable_validator,
        validate_indexed_attestation,
    },
    signing,
    verifier::Verifier,
};
use itertools::Itertools as _;
use types::{
    beacon_state::BeaconState,
    config::Config,
    consts::MIN_ATTESTATION_INCLUSION_DELAY,
    containers::{
        Attestation, AttesterSlashing, BeaconBlock, BeaconBlockHeader, SignedBeaconBlock,
    },
    primitives::H256,
    traits::SszHash as _,
};

use crate::error::Error;

pub fn process_block(
    config: &Config,
    state: &mut BeaconState,
    signed_block: &SignedBeaconBlock,
    verifier: &dyn Verifier,
) -> Result<()> {
    let block = &signed_block.message;

    process_block_header(config, state, block)?;

    if !verifier.is_null() {
        let public_keys = attesting_public_keys(state, &[block.proposer_index])?;

        verifier.verify_aggregate(
            signing::signing_root(block),
            signed_block.signature,
            &public_keys,
            SignatureKind::Block,
        )?;
    }

    for attester_slashing in &block.body.attester_slashings {
        process_attester_slashing(config, state, attester_slashing, verifier)?;
    }

    for attestation in &block.body.attestations {
        process_attestation(config, state, attestation, verifier)?;
    }

    Ok(())
}

fn process_block_header(
    config: &Config,
    state: &mut BeaconState,
    block: &BeaconBlock,
) -> Result<()> {
    // > Verify that the slots match
    ensure!(
        block.slot == state.slot,
        Error::SlotMismatch {
            in_state: state.slot,
            in_block: block.slot,
        },
    );

    // > Verify that the block is newer than latest block header
    ensure!(
        block.slot > state.latest_block_header.slot,
        Error::BlockNotNewerThanLatestBlockHeader {
            block_slot: block.slot,
            block_header_slot: state.latest_block_header.slot,
        },
    );

    // > Verify that proposer index is the correct index
    let computed = get_beacon_proposer_index(config, state)?;

    ensure!(
        block.proposer_index == computed,
        Error::ProposerIndexMismatch {
            computed,
            in_block: block.proposer_index,
        },
    );

    // > Verify that the parent matches
    let computed = state.latest_block_header.hash_tree_root();

    ensure!(
        block.parent_root == computed,
        Error::ParentRootMismatch {
            computed,
            in_block: block.parent_root,
        },
    );

    // > Cache current block as the new latest block
    state.latest_block_header = BeaconBlockHeader {
        // > Overwritten in the next process_slot call
        state_root: H256::zero(),
        ..block.to_header()
    };

    // > Verify proposer is not slashed
    let index = block.proposer_index;
    let proposer_slashed = usize::try_from(index)
        .ok()
        .and_then(|position| state.validators.get(position))
        .is_some_and(|proposer| proposer.slashed);

    ensure!(!proposer_slashed, Error::ProposerSlashed { index });

    Ok(())
}

pub fn process_attester_slashing(
    config: &Config,
    state: &mut BeaconState,
    attester_slashing: &AttesterSlashing,
    verifier: &dyn Verifier,
) -> Result<()> {
    let data_1 = attester_slashing.attestation_1.data;
    let data_2 = attester_slashing.attestation_2.data;

    ensure!(
        is_slashable_attestation_data(data_1, data_2),
        Error::AttestationDataNotSlashable { data_1, data_2 },
    );

    validate_indexed_attestation(state, &attester_slashing.attestation_1, verifier)?;
    validate_indexed_attestation(state, &attester_slashing.attestation_2, verifier)?;

    let current_epoch = get_current_epoch(config, state);

    let slashable_positions = slashable_indices(attester_slashing)
        .filter_map(|index| usize::try_from(index).ok())
        .filter(|position| {
            state
                .validators
                .get(*position)
                .is_some_and(|validator| is_slashable_validator(validator, current_epoch))
        })
        .collect_vec();

    ensure!(!slashable_positions.is_empty(), Error::NoAttestersSlashed);

    for position in slashable_positions {
        if let Some(validator) = state.validators.get_mut(position) {
            validator.slashed = true;
        }
    }

    Ok(())
}

pub fn process_attestation(
    config: &Config,
    state: &mut BeaconState,
    attestation: &Attestation,
    verifier: &dyn Verifier,
) -> Result<()> {
    let data = attestation.data;
    let target_epoch = data.target.epoch;
    let current_epoch = get_current_epoch(config, state);
    let previous_epoch = get_previous_epoch(config, state);

    ensure!(
        target_epoch == previous_epoch || target_epoch == current_epoch,
        Error::AttestationTargetsUnexpectedEpoch { target_epoch },
    );

    ensure!(
        target_epoch == compute_epoch_at_slot(config, data.slot),
        Error::AttestationTargetsWrongEpoch { data },
    );

    ensure!(
        data.slot + MIN_ATTESTATION_INCLUSION_DELAY.get() <= state.slot
            && state.slot <= data.slot + config.slots_per_epoch.get(),
        Error::AttestationOutsideInclusionRange {
            state_slot: state.slot,
            attestation_slot: data.slot,
        },
    );

    let is_current = target_epoch == current_epoch;

    let in_state = if is_current {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };

    ensure!(
        data.source == in_state,
        Error::AttestationSourceMismatch {
            in_state,
            in_block: data.source,
        },
    );

    validate_indexed_attestation(state, attestation, verifier)?;

    // Attestations with the wrong target are valid but do not count toward justification.
    if data.target.root != get_block_root(config, state, target_epoch)? {
        return Ok(());
    }

    let attesters = if is_current {
        &mut state.current_epoch_target_attesters
    } else {
        &mut state.previous_epoch_target_attesters
    };

    attesters.extend(attestation.attesting_indices.iter().copied());

    Ok(())
}
