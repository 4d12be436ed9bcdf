use fork_choice_store::{ChainLink, LatestMessage};
use types::{
    containers::Checkpoint,
    primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
};

use crate::{controller::Controller, wait::Wait};

// Every method loads the latest snapshot separately.
// Use `Controller::owned_store_snapshot` to get several values that are consistent with each other.
impl<W: Wait> Controller<W> {
    #[must_use]
    pub fn time(&self) -> UnixSeconds {
        self.store_snapshot().time()
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.store_snapshot().slot()
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        self.store_snapshot().current_epoch()
    }

    #[must_use]
    pub fn genesis_time(&self) -> UnixSeconds {
        self.store_snapshot().genesis_time()
    }

    #[must_use]
    pub fn head(&self) -> ChainLink {
        self.store_snapshot().head().clone()
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.store_snapshot().get_head()
    }

    #[must_use]
    pub fn head_slot(&self) -> Slot {
        self.store_snapshot().head_slot()
    }

    #[must_use]
    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().justified_checkpoint()
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().finalized_checkpoint()
    }

    #[must_use]
    pub fn unrealized_justified_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().unrealized_justified_checkpoint()
    }

    /// Returns the latest block confirmed by the confirmation rule.
    ///
    /// Falls back to the finalized block if the confirmation rule is disabled.
    #[must_use]
    pub fn confirmed_root(&self) -> H256 {
        let store = self.store_snapshot();

        store
            .confirmed_root()
            .unwrap_or_else(|| store.finalized_checkpoint().root)
    }

    #[must_use]
    pub fn proposer_boost_root(&self) -> Option<H256> {
        self.store_snapshot().proposer_boost_root()
    }

    /// Returns the block a proposer in `slot` should build on.
    #[must_use]
    pub fn proposer_head(&self, slot: Slot) -> H256 {
        let store = self.store_snapshot();
        store.get_proposer_head(store.get_head(), slot)
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.store_snapshot().contains_block(block_root)
    }

    #[must_use]
    pub fn chain_link(&self, block_root: H256) -> Option<ChainLink> {
        self.store_snapshot().chain_link(block_root).cloned()
    }

    /// Returns block roots on the canonical chain from the head down to the finalized block.
    #[must_use]
    pub fn canonical_chain(&self) -> Vec<H256> {
        self.store_snapshot()
            .canonical_chain()
            .map(|chain_link| chain_link.block_root)
            .collect()
    }

    #[must_use]
    pub fn weight(&self, block_root: H256) -> Gwei {
        self.store_snapshot().weight(block_root)
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.store_snapshot().latest_message(validator_index)
    }

    #[must_use]
    pub fn is_equivocating(&self, validator_index: ValidatorIndex) -> bool {
        self.store_snapshot()
            .equivocating_indices()
            .contains(validator_index)
    }

    #[must_use]
    pub fn blocks_len(&self) -> usize {
        self.store_snapshot().blocks_len()
    }
}
