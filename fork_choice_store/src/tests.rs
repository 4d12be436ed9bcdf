use core::num::NonZeroU64;
use std::sync::Arc;

use anyhow::Result;
use factory::GENESIS_TIME;
use helper_functions::verifier::DigestVerifier;
use test_case::test_case;
use transition_functions::{Phase0Transition, StateRootPolicy};
use types::{
    beacon_state::BeaconState,
    config::{Config, JustificationRule},
    containers::SignedBeaconBlock,
    primitives::{Slot, UnixSeconds, H256},
    traits::SszHash as _,
};

use crate::{
    confirmation, AttestationOrigin, AttesterSlashingOrigin, Error, ErrorKind, Store, StoreConfig,
};

type BlockWithState = (Arc<SignedBeaconBlock>, Arc<BeaconState>);
type Sibling = (H256, Arc<SignedBeaconBlock>, Arc<BeaconState>);

struct Context {
    config: Arc<Config>,
    store: Store,
    genesis_state: Arc<BeaconState>,
    genesis_root: H256,
}

impl Context {
    fn new(config: Config) -> Result<Self> {
        Self::with_store_config(config, StoreConfig::default())
    }

    fn with_store_config(config: Config, store_config: StoreConfig) -> Result<Self> {
        let config = Arc::new(config);
        let genesis_state = factory::min_genesis_state(&config);
        let genesis_block = factory::genesis_block(&genesis_state);
        let genesis_root = genesis_block.message.hash_tree_root();

        let store = Store::new(
            Arc::clone(&config),
            store_config,
            Arc::new(Phase0Transition::new(Arc::clone(&config), StateRootPolicy::Verify)),
            Arc::new(DigestVerifier),
            genesis_block,
            Arc::clone(&genesis_state),
        )?;

        Ok(Self {
            config,
            store,
            genesis_state,
            genesis_root,
        })
    }

    fn time(&self, slot: Slot, seconds_into_slot: UnixSeconds) -> UnixSeconds {
        GENESIS_TIME + slot * self.config.seconds_per_slot.get() + seconds_into_slot
    }

    fn tick(&mut self, slot: Slot, seconds_into_slot: UnixSeconds) -> Result<()> {
        let time = self.time(slot, seconds_into_slot);
        self.store.on_tick(time)
    }

    // Builds a chain of full blocks through `last_slot`, delivering every block at the start of
    // its slot.
    fn full_chain(&mut self, last_slot: Slot) -> Result<BlockWithState> {
        let mut state = Arc::clone(&self.genesis_state);
        let mut block = factory::genesis_block(&state);

        for slot in 1..=last_slot {
            self.tick(slot, 0)?;
            (block, state) = factory::full_block(&self.config, state, slot, H256::zero())?;
            self.store.on_block(&block)?;
        }

        Ok((block, state))
    }

    fn empty_genesis_child(&self, slot: Slot) -> Result<BlockWithState> {
        factory::empty_block(
            &self.config,
            Arc::clone(&self.genesis_state),
            slot,
            H256::zero(),
        )
    }

    fn sibling_blocks(&self, slot: Slot) -> Result<[Sibling; 2]> {
        let build = |graffiti| -> Result<_> {
            let (block, state) = factory::empty_block(
                &self.config,
                Arc::clone(&self.genesis_state),
                slot,
                graffiti,
            )?;

            Ok((block.message.hash_tree_root(), block, state))
        };

        let mut siblings = [
            build(H256::repeat_byte(1))?,
            build(H256::repeat_byte(2))?,
        ];

        siblings.sort_by_key(|(root, _, _)| *root);

        Ok(siblings)
    }
}

#[test]
fn anchor_is_the_initial_head() -> Result<()> {
    let context = Context::new(Config::minimal())?;
    let store = &context.store;

    assert_eq!(store.get_head(), context.genesis_root);
    assert_eq!(store.justified_checkpoint().root, context.genesis_root);
    assert_eq!(store.finalized_checkpoint().root, context.genesis_root);
    assert_eq!(store.blocks_len(), 1);
    assert_eq!(store.time(), GENESIS_TIME);

    Ok(())
}

#[test]
fn anchor_with_mismatched_state_is_rejected() {
    let config = Arc::new(Config::minimal());
    let genesis_state = factory::min_genesis_state(&config);
    let other_state = factory::genesis_state(&config, 65);

    let result = Store::new(
        Arc::clone(&config),
        StoreConfig::default(),
        Arc::new(Phase0Transition::new(Arc::clone(&config), StateRootPolicy::Verify)),
        Arc::new(DigestVerifier),
        factory::genesis_block(&genesis_state),
        other_state,
    );

    let error = result.expect_err("anchor state should not match anchor block");

    assert!(matches!(
        error.downcast_ref(),
        Some(Error::AnchorStateMismatch { .. }),
    ));
}

#[test]
fn ties_between_siblings_go_to_the_greater_root() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let [(_, low_block, _), (high_root, high_block, _)] = context.sibling_blocks(1)?;

    // Blocks delivered after the first interval are not boosted.
    context.tick(1, 2)?;
    context.store.on_block(&low_block)?;
    context.store.on_block(&high_block)?;

    assert_eq!(context.store.proposer_boost_root(), None);
    assert_eq!(context.store.get_head(), high_root);

    Ok(())
}

#[test]
fn first_timely_block_receives_proposer_boost() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let [(low_root, low_block, _), (high_root, high_block, _)] = context.sibling_blocks(1)?;

    context.tick(1, 0)?;
    context.store.on_block(&low_block)?;
    context.store.on_block(&high_block)?;

    let store = &context.store;

    assert_eq!(store.proposer_boost_root(), Some(low_root));
    assert_eq!(store.get_head(), low_root);
    assert_eq!(store.weight(low_root), store.proposer_score());
    assert_eq!(store.weight(high_root), 0);
    assert_eq!(store.weight(context.genesis_root), store.proposer_score());

    // The boost expires at the start of the next slot.
    context.tick(2, 0)?;

    assert_eq!(context.store.proposer_boost_root(), None);
    assert_eq!(context.store.get_head(), high_root);

    Ok(())
}

#[test_case(3, 1 => true; "within first of three intervals")]
#[test_case(4, 1 => false; "after first of four intervals")]
#[test_case(4, 0 => true; "at start of slot")]
fn proposer_boost_window_follows_intervals_per_slot(
    intervals_per_slot: u64,
    seconds_into_slot: UnixSeconds,
) -> bool {
    let config = Config {
        intervals_per_slot: NonZeroU64::new(intervals_per_slot).expect("test cases are nonzero"),
        ..Config::minimal()
    };

    let mut context = Context::new(config).expect("anchor is valid");
    let [(low_root, low_block, _), _] = context.sibling_blocks(1).expect("blocks can be built");

    context
        .tick(1, seconds_into_slot)
        .expect("time is after genesis");

    context
        .store
        .on_block(&low_block)
        .expect("block is valid");

    context.store.proposer_boost_root() == Some(low_root)
}

#[test]
fn attestation_with_unreachable_slot_is_invalid() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let genesis_root = context.genesis_root;

    let mut attestation =
        factory::attestation(&context.config, &context.genesis_state, genesis_root, 0, vec![1])?;

    attestation.data.slot = Slot::MAX;
    attestation.data.target.epoch = Slot::MAX / context.config.slots_per_epoch.get();

    context.tick(1, 0)?;

    let error = context
        .store
        .on_attestation(&attestation, AttestationOrigin::Gossip)
        .expect_err("slot cannot be incremented");

    assert!(matches!(
        error.downcast_ref(),
        Some(Error::SlotOutOfRange { slot }) if *slot == Slot::MAX,
    ));
    assert_eq!(ErrorKind::of(&error), ErrorKind::Invalid);
    assert_eq!(context.store.latest_message(1), None);

    Ok(())
}

#[test]
fn future_blocks_and_orphans_are_early() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;

    let (block_1, state_1) = context.empty_genesis_child(1)?;
    let (block_2, _) = factory::empty_block(&context.config, state_1, 2, H256::zero())?;

    let future = context.store.on_block(&block_1).expect_err("block is from the future");

    assert!(matches!(future.downcast_ref(), Some(Error::FutureSlot { slot: 1, .. })));
    assert_eq!(ErrorKind::of(&future), ErrorKind::Early);

    context.tick(2, 0)?;

    let orphan = context.store.on_block(&block_2).expect_err("parent is missing");

    assert!(matches!(orphan.downcast_ref(), Some(Error::UnknownParent { .. })));
    assert_eq!(ErrorKind::of(&orphan), ErrorKind::Early);

    context.store.on_block(&block_1)?;
    context.store.on_block(&block_2)?;

    assert_eq!(context.store.get_head(), block_2.message.hash_tree_root());

    // Duplicates are accepted without effect.
    context.store.on_block(&block_2)?;

    assert_eq!(context.store.blocks_len(), 3);

    Ok(())
}

#[test]
fn tampered_block_is_invalid() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;

    let (block, _) = context.empty_genesis_child(1)?;

    let mut tampered = block.as_ref().clone();
    tampered.signature = Default::default();

    context.tick(1, 0)?;

    let error = context
        .store
        .on_block(&Arc::new(tampered))
        .expect_err("signature should not verify");

    assert!(matches!(error.downcast_ref(), Some(Error::SignatureInvalid { .. })));
    assert_eq!(ErrorKind::of(&error), ErrorKind::Invalid);
    assert_eq!(context.store.blocks_len(), 1);

    Ok(())
}

#[test]
fn votes_move_head_until_voters_are_proven_to_equivocate() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let [(low_root, low_block, low_state), (high_root, high_block, _)] =
        context.sibling_blocks(1)?;

    context.tick(1, 2)?;
    context.store.on_block(&low_block)?;
    context.store.on_block(&high_block)?;

    let attestation = factory::attestation(&context.config, &low_state, low_root, 1, vec![1, 2])?;

    let early = context
        .store
        .on_attestation(&attestation, AttestationOrigin::Gossip)
        .expect_err("attestation can only affect later slots");

    assert!(matches!(early.downcast_ref(), Some(Error::FutureSlot { slot: 2, .. })));

    context.tick(2, 2)?;
    context.store.on_attestation(&attestation, AttestationOrigin::Gossip)?;

    let balance = context.config.max_effective_balance;

    assert_eq!(context.store.get_head(), low_root);
    assert_eq!(context.store.weight(low_root), 2 * balance);
    assert_eq!(context.store.weight_uncached(low_root), 2 * balance);
    assert_eq!(context.store.weight(context.genesis_root), 2 * balance);

    let slashing =
        factory::double_vote(&context.config, &low_state, low_root, high_root, 1, vec![1, 2])?;

    context
        .store
        .on_attester_slashing(&slashing, AttesterSlashingOrigin::Gossip)?;

    assert_eq!(context.store.equivocating_indices().len(), 2);
    assert_eq!(context.store.weight(low_root), 0);
    assert_eq!(context.store.weight_uncached(low_root), 0);
    assert_eq!(context.store.get_head(), high_root);

    // Later votes from equivocating validators are ignored.
    let attestation = factory::attestation(&context.config, &low_state, low_root, 2, vec![1])?;

    context.tick(3, 0)?;
    context.store.on_attestation(&attestation, AttestationOrigin::Gossip)?;

    assert_eq!(context.store.weight(low_root), 0);
    assert_eq!(context.store.get_head(), high_root);

    Ok(())
}

#[test]
fn newer_votes_replace_older_ones() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let [(low_root, low_block, low_state), (high_root, high_block, high_state)] =
        context.sibling_blocks(1)?;

    context.tick(1, 2)?;
    context.store.on_block(&low_block)?;
    context.store.on_block(&high_block)?;

    let config = &context.config;
    let first = factory::attestation(config, &low_state, low_root, 1, vec![3])?;
    let later_epoch = factory::attestation(config, &high_state, high_root, 8, vec![3])?;
    let same_epoch = factory::attestation(config, &low_state, low_root, 2, vec![3])?;

    context.tick(9, 0)?;
    context.store.on_attestation(&first, AttestationOrigin::Gossip)?;

    assert_eq!(context.store.get_head(), low_root);

    context.store.on_attestation(&later_epoch, AttestationOrigin::Gossip)?;

    assert_eq!(context.store.get_head(), high_root);

    // A vote from an earlier epoch does not replace the latest message.
    context.store.on_attestation(&same_epoch, AttestationOrigin::Gossip)?;

    assert_eq!(context.store.latest_message(3).map(|message| message.root), Some(high_root));
    assert_eq!(context.store.weight(high_root), context.store.weight_uncached(high_root));

    Ok(())
}

#[test]
fn attestations_for_unknown_blocks_are_early() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let [(low_root, _, low_state), _] = context.sibling_blocks(1)?;

    let attestation = factory::attestation(&context.config, &low_state, low_root, 1, vec![0])?;

    context.tick(2, 0)?;

    let error = context
        .store
        .on_attestation(&attestation, AttestationOrigin::Gossip)
        .expect_err("voted block is unknown");

    assert!(matches!(
        error.downcast_ref(),
        Some(Error::UnknownBeaconBlockRoot { beacon_block_root }) if *beacon_block_root == low_root,
    ));

    Ok(())
}

#[test_case(vec![], true; "empty")]
#[test_case(vec![2, 1], true; "unsorted")]
#[test_case(vec![1, 1], true; "duplicated")]
#[test_case(vec![1, 64], false; "out of range")]
fn malformed_attesting_indices_are_invalid(
    attesting_indices: Vec<u64>,
    reported_as_invalid_indices: bool,
) -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let [(low_root, low_block, low_state), _] = context.sibling_blocks(1)?;

    context.tick(1, 0)?;
    context.store.on_block(&low_block)?;

    let mut attestation = factory::attestation(&context.config, &low_state, low_root, 1, vec![1])?;

    attestation.attesting_indices = attesting_indices;

    context.tick(2, 0)?;

    let error = context
        .store
        .on_attestation(&attestation, AttestationOrigin::Gossip)
        .expect_err("indices are malformed");

    assert_eq!(ErrorKind::of(&error), ErrorKind::Invalid);
    assert_eq!(
        matches!(error.downcast_ref(), Some(Error::InvalidIndices)),
        reported_as_invalid_indices,
    );

    Ok(())
}

#[test_case(JustificationRule::PullUpTip)]
#[test_case(JustificationRule::SafeSlots)]
fn full_chain_justifies_finalizes_and_prunes(justification_rule: JustificationRule) -> Result<()> {
    let mut context = Context::new(Config::minimal().with_justification_rule(justification_rule))?;
    let (head_block, head_state) = context.full_chain(33)?;

    let store = &context.store;
    let block_16 = head_state.block_roots[16];
    let block_24 = head_state.block_roots[24];

    assert_eq!(store.get_head(), head_block.message.hash_tree_root());
    assert_eq!(store.head_slot(), 33);
    assert_eq!(store.justified_checkpoint().epoch, 3);
    assert_eq!(store.justified_checkpoint().root, block_24);
    assert_eq!(store.finalized_checkpoint().epoch, 2);
    assert_eq!(store.finalized_checkpoint().root, block_16);

    // Blocks before the finalized one are pruned.
    assert_eq!(store.root(), block_16);
    assert_eq!(store.blocks_len(), 18);
    assert!(!store.contains_block(context.genesis_root));

    for chain_link in store.canonical_chain() {
        let block_root = chain_link.block_root;
        assert_eq!(store.weight(block_root), store.weight_uncached(block_root));
    }

    Ok(())
}

#[test]
fn blocks_conflicting_with_finalization_are_ignored() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    context.full_chain(33)?;

    let (late_block, _) =
        factory::empty_block(&context.config, Arc::clone(&context.genesis_state), 3, H256::zero())?;

    let error = context
        .store
        .on_block(&late_block)
        .expect_err("block is older than the finalized block");

    assert_eq!(ErrorKind::of(&error), ErrorKind::Ignored);

    Ok(())
}

#[test]
fn late_weak_head_is_reorged_by_next_proposer() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let config = Arc::clone(&context.config);

    let (block_1, state_1) =
        factory::empty_block(&config, Arc::clone(&context.genesis_state), 1, H256::zero())?;
    let root_1 = block_1.message.hash_tree_root();

    context.tick(1, 0)?;
    context.store.on_block(&block_1)?;

    let attestation = factory::attestation(&config, &state_1, root_1, 1, (0..16).collect())?;
    let (block_2, _) = factory::empty_block(&config, state_1, 2, H256::zero())?;
    let root_2 = block_2.message.hash_tree_root();

    // The block arrives after the attesting interval of its own slot.
    context.tick(2, 4)?;
    context.store.on_attestation(&attestation, AttestationOrigin::Gossip)?;
    context.store.on_block(&block_2)?;

    let store = &context.store;

    assert_eq!(store.get_head(), root_2);
    assert_eq!(store.get_proposer_head(root_2, 3), root_1);

    // Reorgs are limited to the slot right after the head.
    assert_eq!(store.get_proposer_head(root_2, 4), root_2);

    // Timely blocks are never reorged.
    assert_eq!(store.get_proposer_head(root_1, 2), root_1);

    Ok(())
}

#[test]
fn timely_head_is_not_reorged() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let config = Arc::clone(&context.config);

    let (block_1, state_1) =
        factory::empty_block(&config, Arc::clone(&context.genesis_state), 1, H256::zero())?;
    let root_1 = block_1.message.hash_tree_root();

    context.tick(1, 0)?;
    context.store.on_block(&block_1)?;

    let attestation = factory::attestation(&config, &state_1, root_1, 1, (0..16).collect())?;
    let (block_2, _) = factory::empty_block(&config, state_1, 2, H256::zero())?;
    let root_2 = block_2.message.hash_tree_root();

    context.tick(2, 0)?;
    context.store.on_attestation(&attestation, AttestationOrigin::Gossip)?;
    context.store.on_block(&block_2)?;

    assert_eq!(context.store.get_proposer_head(root_2, 3), root_2);

    Ok(())
}

#[test]
fn block_with_overwhelming_support_is_confirmed() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let config = Arc::clone(&context.config);

    let (block_1, state_1) =
        factory::empty_block(&config, Arc::clone(&context.genesis_state), 1, H256::zero())?;
    let root_1 = block_1.message.hash_tree_root();

    context.tick(1, 0)?;
    context.store.on_block(&block_1)?;

    assert_eq!(context.store.confirmed_root(), Some(context.genesis_root));

    let attestation = factory::attestation(&config, &state_1, root_1, 1, (0..64).collect())?;

    context.tick(2, 0)?;
    context.store.on_attestation(&attestation, AttestationOrigin::Gossip)?;
    context.tick(3, 0)?;

    assert_eq!(context.store.confirmed_root(), Some(root_1));

    Ok(())
}

#[test]
fn confirmed_block_stays_on_canonical_chain() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    context.full_chain(33)?;
    context.tick(34, 0)?;

    let store = &context.store;
    let confirmed_root = store.confirmed_root().expect("confirmation rule is enabled");

    assert!(store.is_descendant(store.get_head(), confirmed_root));
    assert!(store.is_descendant(confirmed_root, store.finalized_checkpoint().root));

    Ok(())
}

#[test]
fn confirmation_can_be_disabled() -> Result<()> {
    let store_config = StoreConfig {
        confirmation_rule: false,
        ..StoreConfig::default()
    };

    let mut context = Context::with_store_config(Config::minimal(), store_config)?;
    context.tick(5, 0)?;

    assert_eq!(context.store.confirmed_root(), None);

    Ok(())
}

#[test]
fn confirmation_restarts_from_justified_block_of_previous_epoch() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let (_, head_state) = context.full_chain(33)?;
    let block_24 = head_state.block_roots[24];

    let store = &context.store;

    assert_eq!(store.current_epoch(), 4);
    assert_eq!(store.unrealized_justified_checkpoint().epoch, 3);
    assert_eq!(store.head().unrealized_justified_checkpoint.root, block_24);
    assert_eq!(confirmation::restart_root(store), block_24);

    // Justification from two epochs ago is too old to restart from.
    context.tick(40, 0)?;

    let store = &context.store;

    assert_eq!(store.current_epoch(), 5);
    assert_eq!(confirmation::restart_root(store), store.finalized_checkpoint().root);

    Ok(())
}

#[test]
fn confirmation_restarts_from_finalized_block_if_justified_block_is_not_newer() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;

    context.tick(8, 0)?;

    let store = &context.store;

    assert_eq!(store.current_epoch(), 1);
    assert_eq!(store.unrealized_justified_checkpoint().root, context.genesis_root);
    assert_eq!(store.finalized_checkpoint().root, context.genesis_root);
    assert_eq!(confirmation::restart_root(store), context.genesis_root);

    Ok(())
}

#[test]
fn confirmation_restarts_from_justified_block_only_if_head_agrees() -> Result<()> {
    let config = Config::minimal().with_justification_rule(JustificationRule::SafeSlots);
    let mut context = Context::new(config)?;
    let config = Arc::clone(&context.config);

    let (_, state_29) = context.full_chain(29)?;
    let block_24 = state_29.block_roots[24];

    // Only the full block carries enough votes to justify epoch 3.
    let (justifying_block, justifying_state) =
        factory::full_block(&config, Arc::clone(&state_29), 30, H256::zero())?;
    let (empty_block, empty_state) =
        factory::empty_block(&config, state_29, 30, H256::repeat_byte(1))?;

    let justifying_root = justifying_block.message.hash_tree_root();
    let empty_root = empty_block.message.hash_tree_root();

    context.tick(30, 0)?;
    context.store.on_block(&empty_block)?;
    context.store.on_block(&justifying_block)?;

    let empty_votes = factory::full_attestation(&config, &empty_state, empty_root, 30)?;

    context.tick(31, 0)?;
    context.store.on_attestation(&empty_votes, AttestationOrigin::Gossip)?;
    context.tick(33, 0)?;

    let store = &context.store;
    let justified = store.unrealized_justified_checkpoint();

    assert_eq!(store.current_epoch(), 4);
    assert_eq!(justified.epoch, 3);
    assert_eq!(justified.root, block_24);
    assert_eq!(store.get_head(), empty_root);
    assert_ne!(store.head().unrealized_justified_checkpoint, justified);
    assert_eq!(confirmation::restart_root(store), store.finalized_checkpoint().root);

    for slot in [31, 32] {
        let votes = factory::full_attestation(&config, &justifying_state, justifying_root, slot)?;
        context.store.on_attestation(&votes, AttestationOrigin::Gossip)?;
    }

    let store = &context.store;

    assert_eq!(store.get_head(), justifying_root);
    assert_eq!(store.head().unrealized_justified_checkpoint, justified);
    assert_eq!(confirmation::restart_root(store), block_24);

    Ok(())
}

#[test]
fn slashing_supporters_moves_confirmation_back_to_finalized_block() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;
    let config = Arc::clone(&context.config);

    let (block_1, state_1) =
        factory::empty_block(&config, Arc::clone(&context.genesis_state), 1, H256::zero())?;
    let root_1 = block_1.message.hash_tree_root();

    context.tick(1, 0)?;
    context.store.on_block(&block_1)?;

    let attestation = factory::attestation(&config, &state_1, root_1, 1, (0..64).collect())?;

    context.tick(2, 0)?;
    context.store.on_attestation(&attestation, AttestationOrigin::Gossip)?;
    context.tick(3, 0)?;

    assert_eq!(context.store.confirmed_root(), Some(root_1));

    let slashing = factory::double_vote(
        &config,
        &state_1,
        root_1,
        H256::repeat_byte(7),
        1,
        (0..64).collect(),
    )?;

    context
        .store
        .on_attester_slashing(&slashing, AttesterSlashingOrigin::Gossip)?;
    context.tick(4, 0)?;

    assert_eq!(context.store.attesting_balance(root_1), 0);
    assert_eq!(context.store.get_head(), root_1);
    assert_eq!(context.store.confirmed_root(), Some(context.genesis_root));

    Ok(())
}

#[test]
fn ticks_are_monotonic() -> Result<()> {
    let mut context = Context::new(Config::minimal())?;

    context.tick(3, 3)?;

    let tick = context.store.tick();

    context.tick(2, 0)?;

    assert_eq!(context.store.tick(), tick);
    assert_eq!(context.store.slot(), 3);
    assert_eq!(context.store.time(), context.time(3, 3));

    Ok(())
}
