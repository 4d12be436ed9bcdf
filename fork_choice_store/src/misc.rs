use core::fmt::{Formatter, Result as FmtResult};
use std::sync::Arc;

use derivative::Derivative;
use helper_functions::misc;
use types::{
    beacon_state::BeaconState,
    config::Config,
    containers::{AttestationData, Checkpoint, SignedBeaconBlock},
    primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256},
};

// A signed difference in attesting balance.
pub type Difference = i64;

// Children are compared by weight first and by root second. Ties go to the greater root.
pub type Score = (Gwei, H256);

/// A block accepted into the store along with everything derived from it.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ChainLink {
    pub block_root: H256,
    #[derivative(Debug(format_with = "fmt_block_concisely"))]
    pub block: Arc<SignedBeaconBlock>,
    #[derivative(Debug(format_with = "fmt_as_wildcard"))]
    pub state: Arc<BeaconState>,
    // Whether the block arrived before the attesting interval of its own slot.
    pub is_timely: bool,
    // Checkpoints the post-state would have if its epoch ended right after the block.
    pub unrealized_justified_checkpoint: Checkpoint,
    pub unrealized_finalized_checkpoint: Checkpoint,
}

impl ChainLink {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block.slot()
    }

    #[must_use]
    pub fn epoch(&self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, self.slot())
    }

    #[must_use]
    pub fn parent_root(&self) -> H256 {
        self.block.parent_root()
    }

    #[must_use]
    pub fn current_justified_checkpoint(&self) -> Checkpoint {
        self.state.current_justified_checkpoint
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.state.finalized_checkpoint
    }
}

/// The most recent vote of a single validator.
///
/// Only the target epoch and the head vote are needed.
/// Votes are compared by epoch because the store does not keep attestation slots.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    pub root: H256,
}

pub enum BlockAction {
    Accept(ChainLink),
    Ignore,
    DelayUntilParent(Arc<SignedBeaconBlock>),
    DelayUntilSlot(Arc<SignedBeaconBlock>),
}

pub enum AttestationAction {
    Accept(ValidAttestation),
    Ignore,
    DelayUntilBlock(H256),
    DelayUntilSlot(Slot),
}

/// An attestation that passed validation. Applying it cannot fail.
#[derive(Clone, Debug)]
pub struct ValidAttestation {
    pub data: AttestationData,
    pub attesting_indices: Arc<[ValidatorIndex]>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttestationOrigin {
    Gossip,
    // Attestations in blocks have already been verified by the state transition.
    Block(H256),
}

impl AttestationOrigin {
    #[must_use]
    pub const fn is_from_block(self) -> bool {
        matches!(self, Self::Block(_))
    }

    #[must_use]
    pub const fn verify_signatures(self) -> bool {
        !self.is_from_block()
    }

    #[must_use]
    pub const fn block_root(self) -> Option<H256> {
        match self {
            Self::Gossip => None,
            Self::Block(block_root) => Some(block_root),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttesterSlashingOrigin {
    Gossip,
    Block,
}

impl AttesterSlashingOrigin {
    #[must_use]
    pub const fn verify_signatures(self) -> bool {
        matches!(self, Self::Gossip)
    }
}

fn fmt_block_concisely(block: &SignedBeaconBlock, formatter: &mut Formatter) -> FmtResult {
    formatter
        .debug_struct("SignedBeaconBlock")
        .field("slot", &block.message.slot)
        .field("parent_root", &block.message.parent_root)
        .field("state_root", &block.message.state_root)
        .finish_non_exhaustive()
}

fn fmt_as_wildcard<T>(_: T, formatter: &mut Formatter) -> FmtResult {
    formatter.write_str("_")
}
