//! Fast confirmation of blocks under honest majority and synchrony assumptions.
//!
//! A block is confirmed if enough of the balance that could have voted for it since its slot
//! did so that no adversary controlling up to `confirmation_byzantine_threshold` percent of the
//! total balance could make a competing branch heavier. Confirmation starts from the last
//! confirmed block and extends towards the head one block at a time.
//!
//! Based on the [confirmation rule] proposed for `consensus-specs`.
//!
//! [confirmation rule]: https://github.com/ethereum/consensus-specs/pull/3339

use core::cmp;

use types::primitives::H256;

use crate::store::Store;

/// Computes the latest confirmed block on the canonical chain.
///
/// The result is always the finalized block or one of its descendants.
#[must_use]
pub fn confirmed_root(store: &Store) -> H256 {
    let head_root = store.get_head();
    let base = reconfirmed_root(store).unwrap_or_else(|| restart_root(store));

    if !store.is_descendant(head_root, base) {
        return base;
    }

    let mut canonical = store
        .chain_ending_with(head_root)
        .take_while(|chain_link| chain_link.block_root != base)
        .map(|chain_link| chain_link.block_root)
        .collect::<Vec<_>>();

    canonical.reverse();

    canonical
        .into_iter()
        .take_while(|block_root| is_one_confirmed(store, *block_root))
        .last()
        .unwrap_or(base)
}

// The previous confirmation still holds if it remains on the canonical chain.
fn reconfirmed_root(store: &Store) -> Option<H256> {
    let confirmed_root = store.confirmed_root()?;

    if !store.is_descendant(store.get_head(), confirmed_root) {
        return None;
    }

    let is_finalized = confirmed_root == store.finalized_checkpoint().root;

    (is_finalized || is_one_confirmed(store, confirmed_root)).then_some(confirmed_root)
}

// Restart from the latest justified block if it was justified in the previous epoch and the head
// agrees. Otherwise restart from the finalized block.
pub(crate) fn restart_root(store: &Store) -> H256 {
    let finalized_root = store.finalized_checkpoint().root;
    let justified = store.unrealized_justified_checkpoint();

    if justified.epoch + 1 != store.current_epoch() {
        return finalized_root;
    }

    if store.head().unrealized_justified_checkpoint != justified {
        return finalized_root;
    }

    let finalized_slot = store.chain_link(finalized_root).map(|link| link.slot());
    let justified_slot = store.chain_link(justified.root).map(|link| link.slot());

    match (finalized_slot, justified_slot) {
        (Some(finalized_slot), Some(justified_slot)) if finalized_slot < justified_slot => {
            justified.root
        }
        _ => finalized_root,
    }
}

/// Whether `block_root` has enough support that it cannot be reorged out
/// in the current slot.
///
/// Proposer boost is not counted as support but is added to the balance an adversary could use.
#[must_use]
pub fn is_one_confirmed(store: &Store, block_root: H256) -> bool {
    let Some(chain_link) = store.chain_link(block_root) else {
        return false;
    };

    let Some(parent_slot) = store
        .chain_link(chain_link.parent_root())
        .map(|parent| parent.slot())
    else {
        // The root of the block tree is confirmed by finalization.
        return block_root == store.root();
    };

    let config = store.chain_config();
    let total_balance = u128::from(store.justified_total_active_balance());
    let slots_per_epoch = u128::from(config.slots_per_epoch.get());

    // Slots in which committees could have voted for the block or a sibling.
    let voting_slots = u128::from(store.slot().saturating_sub(parent_slot + 1));

    let max_support = cmp::min(total_balance, total_balance * voting_slots / slots_per_epoch);
    let proposer_score = u128::from(store.proposer_score());
    let byzantine_threshold = u128::from(config.confirmation_byzantine_threshold);

    let support = u128::from(store.attesting_balance(block_root));
    let safety_threshold =
        (max_support + proposer_score) / 2 + max_support * byzantine_threshold / 100;

    support > safety_threshold
}
