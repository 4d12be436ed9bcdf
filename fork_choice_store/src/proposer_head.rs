//! Deciding whether a proposer should build on a late and weak head.
//!
//! Roughly corresponds to [`get_proposer_head`] from the Fork Choice specification.
//! The check for whether the proposer itself is on time is left to the caller, since the store
//! does not know when the proposal will be made.
//!
//! [`get_proposer_head`]: https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/fork-choice.md#get_proposer_head

use helper_functions::misc;
use log::debug;
use types::primitives::{Slot, H256};

use crate::{misc::ChainLink, store::Store};

/// Returns the parent of `head_root` if the proposer at `slot` should reorg it out.
/// Returns `head_root` otherwise, including when either block is unknown.
#[must_use]
pub fn get_proposer_head(store: &Store, head_root: H256, slot: Slot) -> H256 {
    let Some(head) = store.chain_link(head_root) else {
        return head_root;
    };

    let Some(parent) = store.chain_link(head.parent_root()) else {
        return head_root;
    };

    if should_reorg(store, head, parent, slot) {
        debug!(
            "proposer at slot {slot} should build on {:?} instead of late block {head_root:?}",
            parent.block_root,
        );

        return parent.block_root;
    }

    head_root
}

fn should_reorg(store: &Store, head: &ChainLink, parent: &ChainLink, slot: Slot) -> bool {
    let config = store.chain_config();

    if head.is_timely {
        return false;
    }

    // Reorging at an epoch boundary could change the shuffling.
    if misc::is_epoch_start(config, slot) {
        return false;
    }

    if head.unrealized_justified_checkpoint != parent.unrealized_justified_checkpoint {
        return false;
    }

    let epochs_since_finalization = misc::compute_epoch_at_slot(config, slot)
        .saturating_sub(store.finalized_checkpoint().epoch);

    if epochs_since_finalization > config.reorg_max_epochs_since_finalization {
        return false;
    }

    // Only single slot reorgs of a block proposed in the preceding slot.
    if parent.slot() + 1 != head.slot() || head.slot() + 1 != slot {
        return false;
    }

    let committee_weight = u128::from(store.committee_weight());
    let head_weight = u128::from(store.weight(head.block_root));
    let parent_weight = u128::from(store.weight(parent.block_root));

    let head_threshold = committee_weight * u128::from(config.reorg_head_weight_threshold) / 100;
    let parent_threshold =
        committee_weight * u128::from(config.reorg_parent_weight_threshold) / 100;

    head_weight < head_threshold && parent_weight > parent_threshold
}
