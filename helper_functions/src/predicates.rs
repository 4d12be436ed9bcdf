use anyhow::{ensure, Result};
use itertools::Itertools as _;
use types::{
    beacon_state::BeaconState,
    containers::{Attestation, AttestationData, Validator},
    primitives::{Epoch, PublicKeyBytes, ValidatorIndex},
};

use crate::{
    error::{Error, SignatureKind},
    signing,
    verifier::Verifier,
};

// > Check if ``validator`` is active.
#[inline]
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// > Check if ``validator`` is slashable.
#[inline]
#[must_use]
pub const fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed && is_active_validator(validator, epoch)
}

// > Check if ``data_1`` and ``data_2`` are slashable according to Casper FFG rules.
#[inline]
#[must_use]
pub fn is_slashable_attestation_data(data_1: AttestationData, data_2: AttestationData) -> bool {
    // > Double vote
    (data_1 != data_2 && data_1.target.epoch == data_2.target.epoch)
        // > Surround vote
        || (data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch)
}

pub fn validate_indexed_attestation(
    state: &BeaconState,
    attestation: &Attestation,
    verifier: &dyn Verifier,
) -> Result<()> {
    let indices = &attestation.attesting_indices;

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);

    // > Verify indices are sorted and unique
    ensure!(
        indices.iter().tuple_windows().all(|(a, b)| a < b),
        Error::AttestingIndicesNotSortedAndUnique,
    );

    // > Verify aggregate signature
    if verifier.is_null() {
        return Ok(());
    }

    let public_keys = attesting_public_keys(state, indices)?;

    verifier.verify_aggregate(
        signing::signing_root(&attestation.data),
        attestation.signature,
        &public_keys,
        SignatureKind::Attestation,
    )
}

pub fn attesting_public_keys(
    state: &BeaconState,
    indices: &[ValidatorIndex],
) -> Result<Vec<PublicKeyBytes>> {
    indices
        .iter()
        .map(|index| {
            let validator = usize::try_from(*index)
                .ok()
                .and_then(|position| state.validators.get(position))
                .ok_or(Error::ValidatorNotFound { index: *index })?;

            Ok(validator.pubkey)
        })
        .collect()
}
