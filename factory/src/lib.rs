//! Deterministic chains for tests and benchmarks.
//!
//! Every validator has a known public key, so the blocks and attestations built here carry
//! signatures that pass [`DigestVerifier`](helper_functions::verifier::DigestVerifier).
//!
//! Committees are fixed: validator `i` attests in slots `s` where
//! `i % SLOTS_PER_EPOCH == s % SLOTS_PER_EPOCH`.

use core::ops::Range;
use std::sync::Arc;

use anyhow::Result;
use helper_functions::{
    accessors, misc,
    predicates::{attesting_public_keys, is_active_validator},
    signing,
    verifier::NullVerifier,
};
use itertools::Itertools as _;
use transition_functions::{Phase0Transition, StateRootPolicy, StateTransition as _};
use types::{
    beacon_state::BeaconState,
    config::Config,
    consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
    containers::{
        Attestation, AttestationData, AttesterSlashing, BeaconBlock, BeaconBlockBody,
        BeaconBlockHeader, Checkpoint, SignedBeaconBlock, Validator,
    },
    primitives::{Epoch, PublicKeyBytes, Slot, UnixSeconds, ValidatorIndex, H256},
    traits::SszHash as _,
};

pub const GENESIS_TIME: UnixSeconds = 1_606_824_023;
pub const MIN_GENESIS_ACTIVE_VALIDATOR_COUNT: u64 = 64;

type BlockWithState = (Arc<SignedBeaconBlock>, Arc<BeaconState>);

#[must_use]
pub fn public_key(validator_index: ValidatorIndex) -> PublicKeyBytes {
    PublicKeyBytes::from_low_u64_be(validator_index + 1)
}

#[must_use]
pub fn genesis_state(config: &Config, validator_count: u64) -> Arc<BeaconState> {
    let validators = (0..validator_count)
        .map(|index| Validator {
            pubkey: public_key(index),
            effective_balance: config.max_effective_balance,
            slashed: false,
            activation_epoch: GENESIS_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
        })
        .collect();

    Arc::new(BeaconState {
        genesis_time: GENESIS_TIME,
        latest_block_header: BeaconBlockHeader {
            body_root: BeaconBlockBody::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        },
        validators,
        ..BeaconState::default()
    })
}

#[must_use]
pub fn min_genesis_state(config: &Config) -> Arc<BeaconState> {
    genesis_state(config, MIN_GENESIS_ACTIVE_VALIDATOR_COUNT)
}

/// The genesis block matching `genesis_state`. Genesis blocks are not signed.
#[must_use]
pub fn genesis_block(genesis_state: &BeaconState) -> Arc<SignedBeaconBlock> {
    Arc::new(SignedBeaconBlock {
        message: BeaconBlock {
            state_root: genesis_state.hash_tree_root(),
            ..BeaconBlock::default()
        },
        signature: Default::default(),
    })
}

#[must_use]
pub fn committee(config: &Config, state: &BeaconState, slot: Slot) -> Vec<ValidatorIndex> {
    let epoch = misc::compute_epoch_at_slot(config, slot);
    let position = misc::slots_since_epoch_start(config, slot);

    (0..)
        .zip(&state.validators)
        .filter(|(_, validator)| is_active_validator(validator, epoch))
        .map(|(index, _)| index)
        .filter(|index| index % config.slots_per_epoch.get() == position)
        .collect()
}

pub fn empty_block(
    config: &Arc<Config>,
    pre_state: Arc<BeaconState>,
    slot: Slot,
    graffiti: H256,
) -> Result<BlockWithState> {
    block(config, pre_state, slot, graffiti, vec![], vec![])
}

/// A block including attestations from every committee since its parent.
pub fn full_block(
    config: &Arc<Config>,
    pre_state: Arc<BeaconState>,
    slot: Slot,
    graffiti: H256,
) -> Result<BlockWithState> {
    let parent_slot = pre_state.latest_block_header.slot;
    let earliest = slot.saturating_sub(config.slots_per_epoch.get());
    let slots = parent_slot.max(earliest)..slot;
    let attestations = included_attestations(config, &pre_state, slot, slots)?;

    block(config, pre_state, slot, graffiti, attestations, vec![])
}

/// A block in the last slot of `epoch` with attestations from every committee in `epoch`
/// except the last one.
///
/// The attestations target `epoch`, so the block justifies it when its epoch is processed.
/// Unrealized justification sees it immediately.
pub fn block_justifying_current_epoch(
    config: &Arc<Config>,
    pre_state: Arc<BeaconState>,
    epoch: Epoch,
    graffiti: H256,
) -> Result<BlockWithState> {
    let slots = misc::slots_in_epoch(config, epoch);
    let slot = slots.end - 1;
    let attestations = included_attestations(config, &pre_state, slot, slots.start..slot)?;

    block(config, pre_state, slot, graffiti, attestations, vec![])
}

/// A block in the first slot after `epoch` with attestations from every committee in `epoch`.
pub fn block_justifying_previous_epoch(
    config: &Arc<Config>,
    pre_state: Arc<BeaconState>,
    epoch: Epoch,
    graffiti: H256,
) -> Result<BlockWithState> {
    let slots = misc::slots_in_epoch(config, epoch);
    let slot = slots.end;
    let attestations = included_attestations(config, &pre_state, slot, slots)?;

    block(config, pre_state, slot, graffiti, attestations, vec![])
}

pub fn block(
    config: &Arc<Config>,
    pre_state: Arc<BeaconState>,
    slot: Slot,
    graffiti: H256,
    attestations: Vec<Attestation>,
    attester_slashings: Vec<AttesterSlashing>,
) -> Result<BlockWithState> {
    let transition = Phase0Transition::new(Arc::clone(config), StateRootPolicy::Trust);

    let mut state = Arc::unwrap_or_clone(pre_state);

    transition.apply_slots(&mut state, slot)?;

    let mut block = BeaconBlock {
        slot,
        proposer_index: accessors::get_beacon_proposer_index(config, &state)?,
        parent_root: state.latest_block_header.hash_tree_root(),
        state_root: H256::zero(),
        body: BeaconBlockBody {
            graffiti,
            attester_slashings,
            attestations,
        },
    };

    let unsigned = SignedBeaconBlock {
        message: block.clone(),
        signature: Default::default(),
    };

    transition.apply_block(&mut state, &unsigned, &NullVerifier)?;

    block.state_root = state.hash_tree_root();

    let public_keys = attesting_public_keys(&state, &[block.proposer_index])?;
    let signature = signing::sign(&block, &public_keys);

    let signed_block = SignedBeaconBlock {
        message: block,
        signature,
    };

    Ok((Arc::new(signed_block), Arc::new(state)))
}

/// An attestation by `attesting_indices` in `slot` voting for the block with `head_root`.
///
/// `head_state` must be the post-state of that block.
pub fn attestation(
    config: &Arc<Config>,
    head_state: &BeaconState,
    head_root: H256,
    slot: Slot,
    attesting_indices: Vec<ValidatorIndex>,
) -> Result<Attestation> {
    let transition = Phase0Transition::new(Arc::clone(config), StateRootPolicy::Trust);

    let mut state = head_state.clone();
    transition.apply_slots(&mut state, slot)?;

    let data = attestation_data(config, &state, slot, head_root)?;

    sign_attestation(&state, data, attesting_indices)
}

pub fn full_attestation(
    config: &Arc<Config>,
    head_state: &BeaconState,
    head_root: H256,
    slot: Slot,
) -> Result<Attestation> {
    let attesting_indices = committee(config, head_state, slot);
    attestation(config, head_state, head_root, slot, attesting_indices)
}

pub fn singular_attestation(
    config: &Arc<Config>,
    head_state: &BeaconState,
    head_root: H256,
    slot: Slot,
    validator_index: ValidatorIndex,
) -> Result<Attestation> {
    attestation(config, head_state, head_root, slot, vec![validator_index])
}

/// Evidence of `attesting_indices` voting for both `head_root` and `other_root` in `slot`.
pub fn double_vote(
    config: &Arc<Config>,
    head_state: &BeaconState,
    head_root: H256,
    other_root: H256,
    slot: Slot,
    attesting_indices: Vec<ValidatorIndex>,
) -> Result<AttesterSlashing> {
    let attestation_1 = attestation(config, head_state, head_root, slot, attesting_indices)?;

    let data_2 = AttestationData {
        beacon_block_root: other_root,
        ..attestation_1.data
    };

    let attestation_2 =
        sign_attestation(head_state, data_2, attestation_1.attesting_indices.clone())?;

    Ok(AttesterSlashing {
        attestation_1,
        attestation_2,
    })
}

// `state` must be at `slot` or later. Votes in `state.slot` go to `head_root`.
fn attestation_data(
    config: &Config,
    state: &BeaconState,
    slot: Slot,
    head_root: H256,
) -> Result<AttestationData> {
    let root_at = |slot| {
        if slot == state.slot {
            Ok(head_root)
        } else {
            accessors::get_block_root_at_slot(state, slot)
        }
    };

    let target_epoch = misc::compute_epoch_at_slot(config, slot);
    let target_slot = misc::compute_start_slot_at_epoch(config, target_epoch);

    let source = if target_epoch == accessors::get_current_epoch(config, state) {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };

    Ok(AttestationData {
        slot,
        index: 0,
        beacon_block_root: root_at(slot)?,
        source,
        target: Checkpoint {
            epoch: target_epoch,
            root: root_at(target_slot)?,
        },
    })
}

fn sign_attestation(
    state: &BeaconState,
    data: AttestationData,
    attesting_indices: Vec<ValidatorIndex>,
) -> Result<Attestation> {
    let public_keys = attesting_public_keys(state, &attesting_indices)?;

    Ok(Attestation {
        attesting_indices,
        data,
        signature: signing::sign(&data, &public_keys),
    })
}

// Attestations for `slots` as seen from a block in `block_slot` built on `pre_state`.
fn included_attestations(
    config: &Arc<Config>,
    pre_state: &BeaconState,
    block_slot: Slot,
    slots: Range<Slot>,
) -> Result<Vec<Attestation>> {
    let transition = Phase0Transition::new(Arc::clone(config), StateRootPolicy::Trust);

    let mut state = pre_state.clone();
    transition.apply_slots(&mut state, block_slot)?;

    slots
        .map(|slot| {
            let data = attestation_data(config, &state, slot, H256::zero())?;
            sign_attestation(&state, data, committee(config, &state, slot))
        })
        .filter_ok(|attestation| !attestation.attesting_indices.is_empty())
        .collect()
}
