use im::{OrdSet, Vector};
use serde::{Deserialize, Serialize};

use crate::{
    containers::{BeaconBlockHeader, Checkpoint, Validator},
    primitives::{Slot, UnixSeconds, ValidatorIndex, H256},
    traits::{container_root, list_root, SszHash},
};

/// The subset of the beacon state the fork choice engine and its reference state transition use.
///
/// Collections are persistent (`im`), so cloning a state to run a transition on it is cheap.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconState {
    pub genesis_time: UnixSeconds,
    pub slot: Slot,
    pub latest_block_header: BeaconBlockHeader,
    // Unlike in `consensus-specs`, block roots are never overwritten.
    // `block_roots[slot]` is the root of the latest block at or before `slot`.
    pub block_roots: Vector<H256>,
    pub validators: Vector<Validator>,
    pub justification_bits: u8,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    // Validators whose attestations included on chain voted for the matching target.
    pub previous_epoch_target_attesters: OrdSet<ValidatorIndex>,
    pub current_epoch_target_attesters: OrdSet<ValidatorIndex>,
}

impl SszHash for BeaconState {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.genesis_time.hash_tree_root(),
            self.slot.hash_tree_root(),
            self.latest_block_header.hash_tree_root(),
            list_root(&self.block_roots, self.block_roots.len()),
            list_root(&self.validators, self.validators.len()),
            u64::from(self.justification_bits).hash_tree_root(),
            self.previous_justified_checkpoint.hash_tree_root(),
            self.current_justified_checkpoint.hash_tree_root(),
            self.finalized_checkpoint.hash_tree_root(),
            list_root(
                &self.previous_epoch_target_attesters,
                self.previous_epoch_target_attesters.len(),
            ),
            list_root(
                &self.current_epoch_target_attesters,
                self.current_epoch_target_attesters.len(),
            ),
        ])
    }
}
