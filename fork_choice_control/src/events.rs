use fork_choice_store::{ChainLink, Store};
use log::warn;
use serde::Serialize;
use types::{
    containers::Checkpoint,
    primitives::{Epoch, Slot, H256},
};

use crate::{scheduler::Rejection, unbounded_sink::UnboundedSink};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "topic", content = "data", rename_all = "snake_case")]
pub enum Event {
    Head(HeadEvent),
    Justified(CheckpointEvent),
    Finalized(CheckpointEvent),
    Reorganized(ReorganizationEvent),
    Rejected(RejectionEvent),
    Confirmed(ConfirmationEvent),
}

impl Event {
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::Head(_) => "head",
            Self::Justified(_) => "justified",
            Self::Finalized(_) => "finalized",
            Self::Reorganized(_) => "reorganized",
            Self::Rejected(_) => "rejected",
            Self::Confirmed(_) => "confirmed",
        }
    }

    pub fn send(self, event_tx: &impl UnboundedSink<Self>) {
        let topic = self.topic();

        if event_tx.unbounded_send(self).is_err() {
            warn!("unable to send {topic} event because the receiver was dropped");
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct HeadEvent {
    pub slot: Slot,
    pub block: H256,
    pub state: H256,
    pub epoch_transition: bool,
}

impl HeadEvent {
    #[must_use]
    pub fn new(store: &Store, old_head: &ChainLink) -> Self {
        let config = store.chain_config();
        let head = store.head();

        Self {
            slot: head.slot(),
            block: head.block_root,
            state: head.block.message.state_root,
            epoch_transition: head.epoch(config) != old_head.epoch(config),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct CheckpointEvent {
    pub epoch: Epoch,
    pub block: H256,
}

impl From<Checkpoint> for CheckpointEvent {
    fn from(checkpoint: Checkpoint) -> Self {
        let Checkpoint { epoch, root } = checkpoint;
        Self { epoch, block: root }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct ReorganizationEvent {
    pub slot: Slot,
    pub depth: u64,
    pub old_head_block: H256,
    pub new_head_block: H256,
    pub common_ancestor: H256,
}

impl ReorganizationEvent {
    /// Returns `None` if the new head descends from the old one.
    ///
    /// The old head may have been pruned, in which case its distance from the finalized block is
    /// used as the depth.
    #[must_use]
    pub fn new(store: &Store, old_head: &ChainLink) -> Option<Self> {
        let new_head = store.head();

        if store.is_descendant(new_head.block_root, old_head.block_root) {
            return None;
        }

        let common_ancestor = store
            .chain_ending_with(new_head.block_root)
            .find(|chain_link| store.is_descendant(old_head.block_root, chain_link.block_root))
            .map_or_else(|| store.root(), |chain_link| chain_link.block_root);

        let ancestor_slot = store
            .chain_link(common_ancestor)
            .map_or_else(|| store.anchor_slot(), ChainLink::slot);

        Some(Self {
            slot: new_head.slot(),
            depth: old_head.slot().saturating_sub(ancestor_slot),
            old_head_block: old_head.block_root,
            new_head_block: new_head.block_root,
            common_ancestor,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RejectionEvent {
    pub kind: &'static str,
    pub effective_slot: Slot,
    pub reason: String,
}

impl From<&Rejection> for RejectionEvent {
    fn from(rejection: &Rejection) -> Self {
        Self {
            kind: rejection.item.kind(),
            effective_slot: rejection.item.effective_slot(),
            reason: format!("{:#}", rejection.error),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct ConfirmationEvent {
    pub slot: Slot,
    pub block: H256,
}
