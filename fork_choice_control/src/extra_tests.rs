// The tests here go through `Controller`, so every message passes through the scheduler and the
// mutator thread. `Context` waits for each message to be handled before returning.

use std::sync::Arc;

use anyhow::Result;
use fork_choice_store::StoreConfig;
use helper_functions::verifier::DigestVerifier;
use itertools::Itertools as _;
use transition_functions::{Phase0Transition, StateRootPolicy};
use types::{config::Config, containers::Checkpoint, primitives::H256, traits::SszHash as _};

use crate::{
    events::{Event, ReorganizationEvent},
    helpers::Context,
    specialized::TestController,
};

#[test]
fn head_follows_a_chain_of_blocks() -> Result<()> {
    let mut context = Context::minimal()?;
    let chain = context.full_chain(3)?;

    context.assert_head(context.genesis_root());

    for (block, _) in &chain {
        context.on_slot(block.slot());
        context.on_acceptable_block(block);
        context.assert_head_block(block);
    }

    let heads = context
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Head(head) => Some(head.block),
            _ => None,
        })
        .collect_vec();

    let expected = chain
        .iter()
        .map(|(block, _)| block.message.hash_tree_root())
        .collect_vec();

    assert_eq!(heads, expected);

    Ok(())
}

#[test]
fn siblings_with_equal_weight_are_ordered_by_root() -> Result<()> {
    let mut context = Context::minimal()?;
    let config = Arc::clone(context.config());
    let (_, genesis_state) = context.genesis();

    let (block_a, _) =
        factory::empty_block(&config, Arc::clone(&genesis_state), 1, H256::repeat_byte(1))?;
    let (block_b, _) = factory::empty_block(&config, genesis_state, 1, H256::repeat_byte(2))?;

    let root_a = block_a.message.hash_tree_root();
    let root_b = block_b.message.hash_tree_root();

    // Late in the slot, so neither block is boosted.
    context.on_time(context.slot_time(1) + 4);
    context.on_acceptable_block(&block_a);
    context.on_acceptable_block(&block_b);

    context.assert_head(root_a.max(root_b));

    Ok(())
}

#[test]
fn timely_block_wins_with_proposer_boost_until_the_next_slot() -> Result<()> {
    let mut context = Context::minimal()?;
    let config = Arc::clone(context.config());
    let (_, genesis_state) = context.genesis();

    let (block_a, _) =
        factory::empty_block(&config, Arc::clone(&genesis_state), 1, H256::repeat_byte(1))?;
    let (block_b, _) = factory::empty_block(&config, genesis_state, 1, H256::repeat_byte(2))?;

    let (low, high) = if block_a.message.hash_tree_root() < block_b.message.hash_tree_root() {
        (block_a, block_b)
    } else {
        (block_b, block_a)
    };

    context.on_slot(1);
    context.on_acceptable_block(&low);
    context.on_acceptable_block(&high);

    let low_root = low.message.hash_tree_root();

    assert_eq!(context.controller().proposer_boost_root(), Some(low_root));
    context.assert_head(low_root);

    context.on_slot(2);

    assert_eq!(context.controller().proposer_boost_root(), None);
    context.assert_head_block(&high);

    Ok(())
}

#[test]
fn early_messages_are_processed_once_they_become_acceptable() -> Result<()> {
    let mut context = Context::minimal()?;
    let chain = context.full_chain(3)?;
    let config = Arc::clone(context.config());

    let (block_1, state_1) = &chain[0];
    let (block_2, _) = &chain[1];
    let (block_3, _) = &chain[2];

    context.on_delayed_block(block_1);
    context.on_delayed_block(block_3);
    context.on_delayed_block(block_2);

    context.on_slot(3);

    context.assert_head_block(block_3);
    assert_eq!(context.controller().blocks_len(), 4);

    let root_1 = block_1.message.hash_tree_root();
    let attestation = factory::attestation(&config, state_1, root_1, 3, vec![5])?;

    context.on_attestation(attestation);

    assert_eq!(context.controller().latest_message(5), None);

    context.on_slot(4);

    let latest_message = context
        .controller()
        .latest_message(5)
        .expect("attestation should be applied once its slot has passed");

    assert_eq!(latest_message.root, root_1);

    Ok(())
}

#[test]
fn equivocating_validators_lose_their_votes() -> Result<()> {
    let mut context = Context::minimal()?;
    let config = Arc::clone(context.config());
    let (_, genesis_state) = context.genesis();

    let mut blocks = [
        factory::empty_block(&config, Arc::clone(&genesis_state), 1, H256::repeat_byte(1))?,
        factory::empty_block(&config, genesis_state, 1, H256::repeat_byte(2))?,
    ];

    blocks.sort_by_key(|(block, _)| block.message.hash_tree_root());

    let [(low, low_state), (high, _)] = blocks;

    let low_root = low.message.hash_tree_root();
    let high_root = high.message.hash_tree_root();

    context.on_time(context.slot_time(1) + 4);
    context.on_acceptable_block(&low);
    context.on_acceptable_block(&high);
    context.assert_head(high_root);

    let voters = vec![3, 11];

    context.on_attestation(factory::attestation(
        &config,
        &low_state,
        low_root,
        1,
        voters.clone(),
    )?);

    context.on_slot(2);
    context.assert_head(low_root);

    let attester_slashing =
        factory::double_vote(&config, &low_state, low_root, high_root, 1, voters)?;

    context.on_attester_slashing(attester_slashing);

    assert!(context.controller().is_equivocating(3));
    assert!(context.controller().is_equivocating(11));
    assert_eq!(context.controller().weight(low_root), 0);
    context.assert_head(high_root);

    Ok(())
}

#[test]
fn blocks_with_invalid_signatures_are_rejected() -> Result<()> {
    let mut context = Context::minimal()?;
    let chain = context.full_chain(1)?;
    let (block_1, _) = &chain[0];

    let mut tampered = block_1.as_ref().clone();
    tampered.signature = Default::default();

    context.on_slot(1);
    context.on_invalid_block(&Arc::new(tampered));
    context.assert_head(context.genesis_root());

    // The original block is still acceptable.
    context.on_acceptable_block(block_1);
    context.assert_head_block(block_1);

    Ok(())
}

#[test]
fn chain_is_justified_and_finalized() -> Result<()> {
    let mut context = Context::minimal()?;
    let chain = context.full_chain(33)?;

    for (block, _) in &chain {
        context.on_slot(block.slot());
        context.on_acceptable_block(block);
    }

    let (head_block, head_state) = chain.last().expect("chain has 33 blocks");

    context.assert_head_block(head_block);
    context.assert_justified_epoch(3);
    context.assert_finalized_checkpoint(Checkpoint {
        epoch: 2,
        root: head_state.block_roots[16],
    });

    let events = context.take_events();

    let finalized_epochs = events
        .iter()
        .filter_map(|event| match event {
            Event::Finalized(checkpoint) => Some(checkpoint.epoch),
            _ => None,
        })
        .collect_vec();

    let justified_epochs = events
        .iter()
        .filter_map(|event| match event {
            Event::Justified(checkpoint) => Some(checkpoint.epoch),
            _ => None,
        })
        .collect_vec();

    assert_eq!(finalized_epochs.last(), Some(&2));
    assert_eq!(justified_epochs.last(), Some(&3));
    assert!(finalized_epochs.iter().tuple_windows().all(|(a, b)| a < b));
    assert!(justified_epochs.iter().tuple_windows().all(|(a, b)| a < b));

    let confirmed_root = context.controller().confirmed_root();
    let canonical_chain = context.controller().canonical_chain();

    assert!(canonical_chain.contains(&confirmed_root));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::Confirmed(_))));

    Ok(())
}

#[test]
fn switching_branches_is_reported_as_a_reorganization() -> Result<()> {
    let mut context = Context::minimal()?;
    let config = Arc::clone(context.config());
    let (_, genesis_state) = context.genesis();

    let (block_a, _) =
        factory::empty_block(&config, Arc::clone(&genesis_state), 1, H256::repeat_byte(1))?;
    let (block_b, state_b) = factory::empty_block(&config, genesis_state, 2, H256::repeat_byte(2))?;

    let root_a = block_a.message.hash_tree_root();
    let root_b = block_b.message.hash_tree_root();

    context.on_slot(1);
    context.on_acceptable_block(&block_a);
    context.assert_head(root_a);
    context.take_events();

    // Late, so the boost does not decide the outcome.
    // The head may switch as soon as the block arrives if its root is greater.
    context.on_time(context.slot_time(2) + 4);
    context.on_acceptable_block(&block_b);
    context.on_attestation(factory::attestation(
        &config,
        &state_b,
        root_b,
        2,
        (0..8).collect(),
    )?);

    context.on_slot(3);
    context.assert_head(root_b);

    let reorganizations = context
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Reorganized(reorganization) => Some(reorganization),
            _ => None,
        })
        .collect_vec();

    assert_eq!(
        reorganizations,
        [ReorganizationEvent {
            slot: 2,
            depth: 1,
            old_head_block: root_a,
            new_head_block: root_b,
            common_ancestor: context.genesis_root(),
        }],
    );

    Ok(())
}

#[test]
fn proposer_builds_on_parent_of_late_weak_head() -> Result<()> {
    let mut context = Context::minimal()?;
    let config = Arc::clone(context.config());
    let (_, genesis_state) = context.genesis();

    let (block_1, state_1) = factory::empty_block(&config, genesis_state, 1, H256::zero())?;
    let root_1 = block_1.message.hash_tree_root();

    context.on_slot(1);
    context.on_acceptable_block(&block_1);

    let attestation = factory::attestation(&config, &state_1, root_1, 1, (0..16).collect())?;
    let (block_2, _) = factory::empty_block(&config, state_1, 2, H256::zero())?;

    context.on_time(context.slot_time(2) + 4);
    context.on_attestation(attestation);
    context.on_acceptable_block(&block_2);

    context.assert_head_block(&block_2);
    assert_eq!(context.controller().proposer_head(3), root_1);
    assert_eq!(context.controller().proposer_head(4), block_2.message.hash_tree_root());

    Ok(())
}

#[test]
fn disabled_confirmation_rule_falls_back_to_finalized_block() -> Result<()> {
    let store_config = StoreConfig {
        confirmation_rule: false,
        ..StoreConfig::default()
    };

    let mut context = Context::new(Config::minimal(), store_config)?;
    let chain = context.full_chain(4)?;

    for (block, _) in &chain {
        context.on_slot(block.slot());
        context.on_acceptable_block(block);
    }

    context.on_slot(5);

    assert_eq!(context.controller().confirmed_root(), context.genesis_root());

    assert!(!context
        .take_events()
        .iter()
        .any(|event| matches!(event, Event::Confirmed(_))));

    Ok(())
}

#[test]
fn unfinalized_blocks_are_replayed_on_startup() -> Result<()> {
    let context = Context::minimal()?;
    let config = Arc::clone(context.config());
    let (genesis_block, genesis_state) = context.genesis();
    let chain = context.full_chain(5)?;
    let (event_tx, _event_rx) = futures::channel::mpsc::unbounded();

    let (controller, mutator_handle) = TestController::new(
        Arc::clone(&config),
        StoreConfig::default(),
        Arc::new(Phase0Transition::new(Arc::clone(&config), StateRootPolicy::Verify)),
        Arc::new(DigestVerifier),
        genesis_block,
        genesis_state,
        context.slot_time(5),
        None,
        event_tx,
        chain.iter().rev().map(|(block, _)| Arc::clone(block)),
    )?;

    let (head_block, _) = chain.last().expect("chain has 5 blocks");

    assert_eq!(controller.head_root(), head_block.message.hash_tree_root());
    assert_eq!(controller.blocks_len(), 6);

    drop(controller);
    mutator_handle.join()?;

    Ok(())
}
