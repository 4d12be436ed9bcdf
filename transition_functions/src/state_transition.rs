use std::sync::Arc;

use anyhow::{ensure, Result};
use derive_more::Constructor;
use helper_functions::verifier::Verifier;
use types::{
    beacon_state::BeaconState,
    config::Config,
    containers::{BeaconBlock, SignedBeaconBlock},
    primitives::Slot,
    traits::SszHash as _,
};

use crate::{error::Error, phase0};

/// The state transition as seen by fork choice.
///
/// Implementations must be deterministic and must not retain state between calls.
/// Callers pass in copies of states they want to keep.
pub trait StateTransition: Send + Sync {
    /// Advances `state` through empty slots up to `slot`. Does nothing if `state` is already there.
    fn apply_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<()>;

    /// Advances `state` to the slot of `block` and applies `block` to it.
    ///
    /// `state` is left in an unspecified condition if this fails.
    fn apply_block(
        &self,
        state: &mut BeaconState,
        block: &SignedBeaconBlock,
        verifier: &dyn Verifier,
    ) -> Result<()>;

    /// Runs the justification and finalization part of epoch processing on `state`
    /// regardless of where in the epoch it is.
    fn process_justification_and_finalization(&self, state: &mut BeaconState) -> Result<()>;
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum StateRootPolicy {
    #[default]
    Verify,
    Trust,
}

impl StateRootPolicy {
    pub fn verify(self, state: &BeaconState, block: &BeaconBlock) -> Result<()> {
        match self {
            Self::Verify => {
                let computed = state.hash_tree_root();
                let in_block = block.state_root;

                ensure!(
                    computed == in_block,
                    Error::StateRootMismatch { computed, in_block },
                );
            }
            Self::Trust => {}
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Constructor)]
pub struct Phase0Transition {
    config: Arc<Config>,
    state_root_policy: StateRootPolicy,
}

impl StateTransition for Phase0Transition {
    fn apply_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<()> {
        if state.slot == slot {
            return Ok(());
        }

        phase0::process_slots(&self.config, state, slot)
    }

    fn apply_block(
        &self,
        state: &mut BeaconState,
        block: &SignedBeaconBlock,
        verifier: &dyn Verifier,
    ) -> Result<()> {
        // Blocks cannot share a slot with the latest block header.
        // Equality is caught by `process_block_header`.
        self.apply_slots(state, block.slot())?;

        phase0::process_block(&self.config, state, block, verifier)?;

        self.state_root_policy.verify(state, &block.message)
    }

    fn process_justification_and_finalization(&self, state: &mut BeaconState) -> Result<()> {
        phase0::process_justification_and_finalization(&self.config, state)
    }
}
