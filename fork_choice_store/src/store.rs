use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use clock::Tick;
use derivative::Derivative;
use features::Feature;
use hash_hasher::{HashedMap, HashedSet};
use helper_functions::{
    accessors, misc, predicates,
    verifier::{NullVerifier, Verifier},
};
use im::HashMap;
use itertools::Itertools as _;
use log::{debug, warn};
use transition_functions::StateTransition;
use types::{
    beacon_state::BeaconState,
    config::{Config as ChainConfig, JustificationRule},
    consts::{GENESIS_EPOCH, GENESIS_SLOT},
    containers::{Attestation, AttesterSlashing, Checkpoint, SignedBeaconBlock},
    primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    traits::SszHash as _,
};

use crate::{
    block_tree::BlockTree,
    checkpoints::{CheckpointChanges, Checkpoints},
    confirmation,
    equivocations::EquivocatingIndices,
    error::Error,
    misc::{
        AttestationAction, AttestationOrigin, AttesterSlashingOrigin, BlockAction, ChainLink,
        Difference, LatestMessage, Score, ValidAttestation,
    },
    proposer_head,
    store_config::StoreConfig,
};

/// [`Store`] from the Fork Choice specification.
///
/// Every mutation is split into a `validate_*` method that takes `&self` and an `apply_*` method
/// that cannot fail. A message that fails validation leaves the store untouched.
/// The `on_*` methods combine the two and report deferrals as [`Error`]s.
///
/// [`Store`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#store
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Store {
    chain_config: Arc<ChainConfig>,
    store_config: StoreConfig,
    #[derivative(Debug = "ignore")]
    transition: Arc<dyn StateTransition>,
    #[derivative(Debug = "ignore")]
    verifier: Arc<dyn Verifier>,
    time: UnixSeconds,
    genesis_time: UnixSeconds,
    tick: Tick,
    checkpoints: Checkpoints,
    // Zero when no block has been boosted in the current slot.
    proposer_boost_root: H256,
    equivocating_indices: EquivocatingIndices,
    blocks: BlockTree,
    // Balances of validators in the justified checkpoint state indexed by validator.
    // Looking them up in `BeaconState.validators` for every vote would be slower.
    #[derivative(Debug = "ignore")]
    justified_active_balances: Arc<[Gwei]>,
    justified_total_active_balance: Gwei,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
    confirmed_root: Option<H256>,
    head: ChainLink,
}

impl Store {
    /// Roughly corresponds to [`get_forkchoice_store`] from the Fork Choice specification.
    ///
    /// The anchor does not have to be the genesis block, but `anchor_state` must be its post-state.
    ///
    /// [`get_forkchoice_store`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_forkchoice_store
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        transition: Arc<dyn StateTransition>,
        verifier: Arc<dyn Verifier>,
        anchor_block: Arc<SignedBeaconBlock>,
        anchor_state: Arc<BeaconState>,
    ) -> Result<Self> {
        let block_root = anchor_block.message.hash_tree_root();
        let computed = anchor_state.hash_tree_root();
        let in_block = anchor_block.message.state_root;

        ensure!(
            computed == in_block,
            Error::AnchorStateMismatch { computed, in_block },
        );

        let epoch = accessors::get_current_epoch(&chain_config, &anchor_state);
        let checkpoint = Checkpoint {
            epoch,
            root: block_root,
        };

        let genesis_time = anchor_state.genesis_time;
        let tick = Tick::start_of_slot(anchor_state.slot);
        let time = tick.time(&chain_config, genesis_time);
        let justified_active_balances = Arc::<[Gwei]>::from(accessors::get_active_balances(
            &chain_config,
            &anchor_state,
        ));
        let justified_total_active_balance = justified_active_balances.iter().sum();

        let anchor = ChainLink {
            block_root,
            block: anchor_block,
            state: anchor_state,
            is_timely: false,
            unrealized_justified_checkpoint: checkpoint,
            unrealized_finalized_checkpoint: checkpoint,
        };

        Ok(Self {
            chain_config,
            store_config,
            transition,
            verifier,
            time,
            genesis_time,
            tick,
            checkpoints: Checkpoints::new(checkpoint),
            proposer_boost_root: H256::zero(),
            equivocating_indices: EquivocatingIndices::default(),
            blocks: BlockTree::new(anchor.clone()),
            justified_active_balances,
            justified_total_active_balance,
            latest_messages: HashMap::new(),
            confirmed_root: None,
            head: anchor,
        })
    }

    #[must_use]
    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        self.store_config
    }

    #[must_use]
    pub const fn time(&self) -> UnixSeconds {
        self.time
    }

    #[must_use]
    pub const fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.tick.slot
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        self.tick.epoch(&self.chain_config)
    }

    #[must_use]
    pub fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1).max(GENESIS_EPOCH)
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.checkpoints.justified
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.checkpoints.finalized
    }

    #[must_use]
    pub const fn unrealized_justified_checkpoint(&self) -> Checkpoint {
        self.checkpoints.unrealized_justified
    }

    #[must_use]
    pub const fn unrealized_finalized_checkpoint(&self) -> Checkpoint {
        self.checkpoints.unrealized_finalized
    }

    #[must_use]
    pub const fn queued_justified_checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoints.queued_justified
    }

    #[must_use]
    pub fn finalized_slot(&self) -> Slot {
        misc::compute_start_slot_at_epoch(&self.chain_config, self.checkpoints.finalized.epoch)
    }

    #[must_use]
    pub fn proposer_boost_root(&self) -> Option<H256> {
        Some(self.proposer_boost_root).filter(|root| !root.is_zero())
    }

    #[must_use]
    pub const fn equivocating_indices(&self) -> &EquivocatingIndices {
        &self.equivocating_indices
    }

    #[must_use]
    pub const fn confirmed_root(&self) -> Option<H256> {
        self.confirmed_root
    }

    #[must_use]
    pub const fn head(&self) -> &ChainLink {
        &self.head
    }

    /// Roughly corresponds to [`get_head`] from the Fork Choice specification.
    ///
    /// The head is kept up to date by every mutation, so this is a lookup.
    ///
    /// [`get_head`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_head
    #[must_use]
    pub const fn get_head(&self) -> H256 {
        self.head.block_root
    }

    #[must_use]
    pub fn head_slot(&self) -> Slot {
        self.head.slot()
    }

    /// See [`proposer_head::get_proposer_head`].
    #[must_use]
    pub fn get_proposer_head(&self, head_root: H256, slot: Slot) -> H256 {
        proposer_head::get_proposer_head(self, head_root, slot)
    }

    #[must_use]
    pub fn chain_link(&self, block_root: H256) -> Option<&ChainLink> {
        self.blocks.chain_link(block_root)
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.blocks.contains(block_root)
    }

    #[must_use]
    pub fn blocks_len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub const fn root(&self) -> H256 {
        self.blocks.root()
    }

    pub fn chain_ending_with(&self, block_root: H256) -> impl Iterator<Item = &ChainLink> + '_ {
        self.blocks.ancestors(block_root)
    }

    pub fn canonical_chain(&self) -> impl Iterator<Item = &ChainLink> + '_ {
        self.chain_ending_with(self.head.block_root)
    }

    pub fn children(&self, block_root: H256) -> impl Iterator<Item = H256> + '_ {
        self.blocks.children(block_root)
    }

    #[must_use]
    pub fn ancestor(&self, block_root: H256, slot: Slot) -> Option<H256> {
        self.blocks.ancestor(block_root, slot)
    }

    #[must_use]
    pub fn is_descendant(&self, descendant: H256, ancestor: H256) -> bool {
        self.blocks.is_descendant(descendant, ancestor)
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.latest_messages.get(&validator_index).copied()
    }

    #[must_use]
    pub fn latest_messages_len(&self) -> usize {
        self.latest_messages.len()
    }

    #[must_use]
    pub const fn justified_total_active_balance(&self) -> Gwei {
        self.justified_total_active_balance
    }

    /// The balance a single slot's committee is expected to carry.
    #[must_use]
    pub fn committee_weight(&self) -> Gwei {
        self.justified_total_active_balance / self.chain_config.slots_per_epoch.get()
    }

    #[must_use]
    pub fn proposer_score(&self) -> Gwei {
        self.committee_weight() * self.chain_config.proposer_score_boost / 100
    }

    /// Balance of the latest votes for `block_root` and its descendants, not counting
    /// equivocating validators.
    #[must_use]
    pub fn attesting_balance(&self, block_root: H256) -> Gwei {
        self.blocks.attesting_balance(block_root)
    }

    /// Roughly corresponds to [`get_weight`] from the Fork Choice specification.
    ///
    /// [`get_weight`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_weight
    #[must_use]
    pub fn weight(&self, block_root: H256) -> Gwei {
        self.attesting_balance(block_root) + self.proposer_boost_for(block_root)
    }

    /// Computes the weight of `block_root` by going through every latest message.
    ///
    /// Much slower than [`Self::weight`]. The two should always agree.
    #[must_use]
    pub fn weight_uncached(&self, block_root: H256) -> Gwei {
        let attesting_balance = self
            .latest_messages
            .iter()
            .filter(|(index, _)| !self.equivocating_indices.contains(**index))
            .filter(|(_, message)| self.blocks.is_descendant(message.root, block_root))
            .map(|(index, _)| self.justified_active_balance(*index))
            .sum::<Gwei>();

        attesting_balance + self.proposer_boost_for(block_root)
    }

    fn proposer_boost_for(&self, block_root: H256) -> Gwei {
        match self.proposer_boost_root() {
            Some(boost_root) if self.blocks.is_descendant(boost_root, block_root) => {
                self.proposer_score()
            }
            _ => 0,
        }
    }

    fn justified_active_balance(&self, validator_index: ValidatorIndex) -> Gwei {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.justified_active_balances.get(index))
            .copied()
            .unwrap_or_default()
    }

    fn score(&self, block_root: H256) -> Score {
        (self.weight(block_root), block_root)
    }

    /// Advances the store clock to `time`.
    ///
    /// Corresponds to [`on_tick`] from the Fork Choice specification. Every slot between the old
    /// and new time is processed in order. Times earlier than the current one are ignored.
    ///
    /// [`on_tick`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_tick
    pub fn on_tick(&mut self, time: UnixSeconds) -> Result<()> {
        if time <= self.time {
            return Ok(());
        }

        let new_tick = Tick::at_time(&self.chain_config, time, self.genesis_time)?;

        while self.tick.slot < new_tick.slot {
            self.apply_tick(Tick::start_of_slot(self.tick.slot + 1));
        }

        self.apply_tick(new_tick);
        self.time = time;

        Ok(())
    }

    fn seconds_into_slot(&self) -> UnixSeconds {
        let slot_start =
            Tick::start_of_slot(self.slot()).time(&self.chain_config, self.genesis_time);

        self.time.saturating_sub(slot_start)
    }

    /// Moves the store to `new_tick`. Earlier ticks are ignored.
    ///
    /// Callers must not skip slots. [`Self::on_tick`] takes care of that.
    pub fn apply_tick(&mut self, new_tick: Tick) {
        let old_tick = self.tick;

        if new_tick <= old_tick {
            return;
        }

        self.tick = new_tick;
        self.time = self.time.max(new_tick.time(&self.chain_config, self.genesis_time));

        if new_tick.slot <= old_tick.slot {
            return;
        }

        // > Reset store.proposer_boost_root if this is a new slot
        self.proposer_boost_root = H256::zero();

        // `on_tick` applies the start of every slot, so epochs are always entered at their start.
        if new_tick.is_start_of_epoch(&self.chain_config) {
            let changes = match self.chain_config.justification_rule {
                // > If a new epoch, pull-up justification and finalization from previous epoch
                JustificationRule::PullUpTip => self.checkpoints.pull_up_unrealized(),
                JustificationRule::SafeSlots => {
                    let finalized = self.checkpoints.finalized;
                    let finalized_slot =
                        misc::compute_start_slot_at_epoch(&self.chain_config, finalized.epoch);
                    let blocks = &self.blocks;

                    self.checkpoints.promote_queued(|queued| {
                        blocks.ancestor(queued.root, finalized_slot) == Some(finalized.root)
                    })
                }
            };

            self.handle_checkpoint_changes(changes);
        }

        self.update_head();

        if self.store_config.confirmation_rule {
            self.confirmed_root = Some(confirmation::confirmed_root(self));
        }
    }

    /// Roughly corresponds to [`on_block`] from the Fork Choice specification.
    ///
    /// Blocks that are already in the store are accepted without effect.
    ///
    /// [`on_block`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_block
    pub fn on_block(&mut self, block: &Arc<SignedBeaconBlock>) -> Result<()> {
        match self.validate_block(block)? {
            BlockAction::Accept(chain_link) => self.apply_block(chain_link),
            BlockAction::Ignore => {}
            BlockAction::DelayUntilParent(block) => bail!(Error::UnknownParent {
                block_root: block.message.hash_tree_root(),
                parent_root: block.parent_root(),
            }),
            BlockAction::DelayUntilSlot(block) => bail!(Error::FutureSlot {
                slot: block.slot(),
                current_slot: self.slot(),
            }),
        }

        Ok(())
    }

    pub fn validate_block(&self, block: &Arc<SignedBeaconBlock>) -> Result<BlockAction> {
        let block_root = block.message.hash_tree_root();

        if self.blocks.contains(block_root) {
            return Ok(BlockAction::Ignore);
        }

        // > Blocks cannot be in the future.
        // > If they are, their consideration must be delayed until they are in the past.
        if self.slot() < block.slot() {
            return Ok(BlockAction::DelayUntilSlot(Arc::clone(block)));
        }

        // > Check that block is later than the finalized epoch slot
        // > (optimization to reduce calls to get_ancestor)
        let finalized_slot = self.finalized_slot();

        ensure!(
            finalized_slot < block.slot(),
            Error::AlreadyFinalized {
                slot: block.slot(),
                finalized_slot,
            },
        );

        // > Parent block must be known
        let Some(parent) = self.blocks.chain_link(block.parent_root()) else {
            return Ok(BlockAction::DelayUntilParent(Arc::clone(block)));
        };

        ensure!(
            parent.slot() < block.slot(),
            Error::NotLaterThanParent {
                block_root,
                slot: block.slot(),
                parent_slot: parent.slot(),
            },
        );

        // > Check block is a descendant of the finalized block at the checkpoint finalized slot
        let finalized_root = self.checkpoints.finalized.root;

        ensure!(
            self.blocks.is_descendant(parent.block_root, finalized_root),
            Error::ConflictsWithFinalized {
                block_root,
                finalized_root,
            },
        );

        // > Check the block is valid and compute the post-state
        let mut state = parent.state.as_ref().clone();

        self.transition
            .apply_block(&mut state, block, self.verifier.as_ref())
            .map_err(|error| Error::block_transition(block_root, error))?;

        // > Eagerly compute unrealized justification and finality
        let mut unrealized_state = state.clone();

        self.transition
            .process_justification_and_finalization(&mut unrealized_state)
            .map_err(|error| Error::block_transition(block_root, error))?;

        // > Add proposer score boost if the block is timely
        let is_timely = self.slot() == block.slot()
            && self.seconds_into_slot() < self.chain_config.seconds_per_interval();

        Ok(BlockAction::Accept(ChainLink {
            block_root,
            block: Arc::clone(block),
            state: Arc::new(state),
            is_timely,
            unrealized_justified_checkpoint: unrealized_state.current_justified_checkpoint,
            unrealized_finalized_checkpoint: unrealized_state.finalized_checkpoint,
        }))
    }

    /// Applies a block previously validated using [`Self::validate_block`].
    pub fn apply_block(&mut self, chain_link: ChainLink) {
        let block_root = chain_link.block_root;
        let block = Arc::clone(&chain_link.block);

        // Only the first timely block in a slot is boosted.
        // See <https://github.com/ethereum/consensus-specs/pull/3352>.
        if chain_link.is_timely && self.proposer_boost_root.is_zero() {
            self.proposer_boost_root = block_root;
        }

        let changes = self.update_checkpoints(&chain_link);

        self.blocks.insert(chain_link);
        self.handle_checkpoint_changes(changes);

        for attester_slashing in &block.message.body.attester_slashings {
            match self.validate_attester_slashing(attester_slashing, AttesterSlashingOrigin::Block)
            {
                Ok(slashable_indices) => self.insert_equivocating_indices(slashable_indices),
                Err(error) => debug!(
                    "attester slashing in block {block_root:?} has no effect on fork choice: \
                     {error}",
                ),
            }
        }

        for attestation in &block.message.body.attestations {
            match self.validate_attestation(attestation, AttestationOrigin::Block(block_root)) {
                Ok(AttestationAction::Accept(valid_attestation)) => {
                    self.update_latest_messages(valid_attestation);
                }
                Ok(_) => {}
                Err(error) => debug!(
                    "attestation in block {block_root:?} has no effect on fork choice: {error}",
                ),
            }
        }

        self.update_head();
    }

    fn update_checkpoints(&mut self, chain_link: &ChainLink) -> CheckpointChanges {
        let justified = chain_link.current_justified_checkpoint();
        let finalized = chain_link.finalized_checkpoint();

        self.checkpoints.update_unrealized(
            chain_link.unrealized_justified_checkpoint,
            chain_link.unrealized_finalized_checkpoint,
        );

        match self.chain_config.justification_rule {
            JustificationRule::PullUpTip => {
                // > Update checkpoints in store if necessary
                let mut changes = self.checkpoints.update(justified, finalized);

                // > If the block is from a prior epoch, apply the realized values
                if chain_link.epoch(&self.chain_config) < self.current_epoch() {
                    changes |= self.checkpoints.update(
                        chain_link.unrealized_justified_checkpoint,
                        chain_link.unrealized_finalized_checkpoint,
                    );
                }

                changes
            }
            JustificationRule::SafeSlots => {
                let should_update_justified = self.should_update_justified(justified);

                let finalized_slot =
                    misc::compute_start_slot_at_epoch(&self.chain_config, finalized.epoch);

                let justified_conflicts_with_finalized =
                    self.blocks.ancestor(self.checkpoints.justified.root, finalized_slot)
                        != Some(finalized.root);

                self.checkpoints.update_with_safe_slots(
                    justified,
                    finalized,
                    should_update_justified,
                    justified_conflicts_with_finalized,
                )
            }
        }
    }

    // > To address the bouncing attack, only update conflicting justified
    // > checkpoints in the fork choice if in the early slots of the epoch.
    // > Otherwise, delay incorporation of new justified checkpoint until next epoch boundary.
    fn should_update_justified(&self, new_justified: Checkpoint) -> bool {
        let slots_since_epoch_start =
            misc::slots_since_epoch_start(&self.chain_config, self.slot());

        if slots_since_epoch_start < self.chain_config.safe_slots_to_update_justified {
            return true;
        }

        let justified = self.checkpoints.justified;
        let justified_slot = misc::compute_start_slot_at_epoch(&self.chain_config, justified.epoch);

        self.blocks.ancestor(new_justified.root, justified_slot) == Some(justified.root)
    }

    fn handle_checkpoint_changes(&mut self, changes: CheckpointChanges) {
        if changes.justified_updated {
            debug!("justified checkpoint updated: {:?}", self.checkpoints.justified);
            self.update_balances_after_justification();
        }

        if changes.finalized_updated {
            debug!("finalized checkpoint updated: {:?}", self.checkpoints.finalized);

            if self.store_config.prune_below_finalized {
                self.prune_after_finalization();
            }
        }
    }

    fn update_balances_after_justification(&mut self) {
        let Some(new_balances) = self.checkpoint_active_balances(self.checkpoints.justified) else {
            return;
        };

        let old_balances = core::mem::replace(&mut self.justified_active_balances, new_balances);

        self.justified_total_active_balance = self.justified_active_balances.iter().sum();

        let mut differences = Self::difference_map();

        for (validator_index, latest_message) in &self.latest_messages {
            if self.equivocating_indices.contains(*validator_index) {
                continue;
            }

            let Ok(index) = usize::try_from(*validator_index) else {
                continue;
            };

            let old_balance = old_balances.get(index).copied().unwrap_or_default();
            let new_balance = self.justified_active_balance(*validator_index);

            // Skipping unchanged balances does not affect the result but saves time.
            if old_balance == new_balance {
                continue;
            }

            let difference = differences.entry(latest_message.root).or_default();

            *difference = difference
                .saturating_sub_unsigned(old_balance)
                .saturating_add_unsigned(new_balance);
        }

        self.blocks.apply_differences(differences);
    }

    // Balances in the checkpoint state, which is the state of the checkpoint block advanced to
    // the start of the checkpoint epoch.
    fn checkpoint_active_balances(&self, checkpoint: Checkpoint) -> Option<Arc<[Gwei]>> {
        let Some(chain_link) = self.blocks.chain_link(checkpoint.root) else {
            warn!("justified block is not in the store: {checkpoint:?}");
            return None;
        };

        let epoch_start = misc::compute_start_slot_at_epoch(&self.chain_config, checkpoint.epoch);
        let mut state = chain_link.state.as_ref().clone();

        if state.slot < epoch_start {
            if let Err(error) = self.transition.apply_slots(&mut state, epoch_start) {
                warn!("failed to compute checkpoint state for {checkpoint:?}: {error:?}");
                state = chain_link.state.as_ref().clone();
            }
        }

        Some(accessors::get_active_balances(&self.chain_config, &state).into())
    }

    fn prune_after_finalization(&mut self) {
        let finalized_root = self.checkpoints.finalized.root;
        let pruned = self.blocks.prune(finalized_root);

        if pruned.is_empty() {
            return;
        }

        debug!("pruned {} blocks below finalized block {finalized_root:?}", pruned.len());

        let pruned = pruned.into_iter().collect::<HashedSet<_>>();

        // Votes for pruned blocks are moved to the finalized block so that every latest message
        // refers to a block in the store. Their balances no longer count towards any other block.
        let mut finalized_difference: Difference = 0;

        for (validator_index, latest_message) in self.latest_messages.iter_mut() {
            if !pruned.contains(&latest_message.root) {
                continue;
            }

            latest_message.root = finalized_root;

            if !self.equivocating_indices.contains(*validator_index) {
                let balance = usize::try_from(*validator_index)
                    .ok()
                    .and_then(|index| self.justified_active_balances.get(index))
                    .copied()
                    .unwrap_or_default();

                finalized_difference = finalized_difference.saturating_add_unsigned(balance);
            }
        }

        self.blocks
            .apply_difference(finalized_root, finalized_difference);

        if self
            .confirmed_root
            .is_some_and(|confirmed_root| !self.blocks.contains(confirmed_root))
        {
            self.confirmed_root = None;
        }

        if !self.blocks.contains(self.proposer_boost_root) {
            self.proposer_boost_root = H256::zero();
        }
    }

    /// Roughly corresponds to [`on_attestation`] from the Fork Choice specification.
    ///
    /// [`on_attestation`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_attestation
    pub fn on_attestation(
        &mut self,
        attestation: &Attestation,
        origin: AttestationOrigin,
    ) -> Result<()> {
        match self.validate_attestation(attestation, origin)? {
            AttestationAction::Accept(valid_attestation) => {
                self.apply_attestation(valid_attestation)
            }
            AttestationAction::Ignore => {}
            AttestationAction::DelayUntilBlock(block_root) => {
                let target = attestation.data.target;

                if block_root == target.root {
                    bail!(Error::UnknownTarget { target });
                }

                bail!(Error::UnknownBeaconBlockRoot {
                    beacon_block_root: block_root,
                });
            }
            AttestationAction::DelayUntilSlot(slot) => bail!(Error::FutureSlot {
                slot,
                current_slot: self.slot(),
            }),
        }

        Ok(())
    }

    pub fn validate_attestation(
        &self,
        attestation: &Attestation,
        origin: AttestationOrigin,
    ) -> Result<AttestationAction> {
        let data = attestation.data;
        let target = data.target;

        // > Check that the epoch number and slot number are matching
        ensure!(
            target.epoch == misc::compute_epoch_at_slot(&self.chain_config, data.slot),
            Error::AttestationTargetsWrongEpoch { data },
        );

        // Attestations in blocks are not subject to time constraints.
        // The state transition has already checked them against the block.
        if !origin.is_from_block() {
            // > Attestations must be from the current or previous epoch
            let previous_epoch = self.previous_epoch();

            ensure!(
                previous_epoch <= target.epoch,
                Error::AttestationTooOld {
                    target_epoch: target.epoch,
                    previous_epoch,
                },
            );

            // > Attestations can only affect the fork choice of subsequent slots.
            // > Delay consideration in the fork choice until their slot is in the past.
            let effective_slot = data
                .slot
                .checked_add(1)
                .ok_or(Error::SlotOutOfRange { slot: data.slot })?;

            if self.slot() < effective_slot {
                if Feature::IgnoreFutureAttestations.is_enabled() {
                    return Ok(AttestationAction::Ignore);
                }

                return Ok(AttestationAction::DelayUntilSlot(effective_slot));
            }
        }

        let finalized_epoch = self.checkpoints.finalized.epoch;

        ensure!(
            finalized_epoch <= target.epoch,
            Error::AlreadyFinalized {
                slot: data.slot,
                finalized_slot: self.finalized_slot(),
            },
        );

        let ignore_unknown = !origin.is_from_block()
            && Feature::IgnoreAttestationsForUnknownBlocks.is_enabled();

        // > Attestation target must be for a known block.
        // > If target block is unknown, delay consideration until block is found.
        let Some(target_link) = self.blocks.chain_link(target.root) else {
            if ignore_unknown {
                return Ok(AttestationAction::Ignore);
            }

            return Ok(AttestationAction::DelayUntilBlock(target.root));
        };

        // > Attestations must be for a known block.
        // > If block is unknown, delay consideration until the block is found.
        let Some(head_link) = self.blocks.chain_link(data.beacon_block_root) else {
            if ignore_unknown {
                return Ok(AttestationAction::Ignore);
            }

            return Ok(AttestationAction::DelayUntilBlock(data.beacon_block_root));
        };

        // > Attestations must not be for blocks in the future. If not, the attestation should not
        // > be considered.
        ensure!(
            head_link.slot() <= data.slot,
            Error::AttestationForFutureBlock {
                data,
                block_slot: head_link.slot(),
            },
        );

        // > LMD vote must be consistent with FFG vote target
        let target_slot = misc::compute_start_slot_at_epoch(&self.chain_config, target.epoch);
        let ancestor = self.blocks.ancestor(data.beacon_block_root, target_slot);

        ensure!(
            ancestor == Some(target.root),
            Error::FfgAndLmdInconsistent { data, ancestor },
        );

        let indices = &attestation.attesting_indices;

        ensure!(
            !indices.is_empty() && indices.iter().tuple_windows().all(|(a, b)| a < b),
            Error::InvalidIndices,
        );

        // Indices are sorted, so checking the last one is enough.
        if let Some(&index) = indices.last() {
            let in_registry = usize::try_from(index)
                .is_ok_and(|position| position < target_link.state.validators.len());

            ensure!(in_registry, Error::InvalidValidatorIndex { index });
        }

        // > Check signature
        if origin.verify_signatures() {
            predicates::validate_indexed_attestation(
                &target_link.state,
                attestation,
                self.verifier.as_ref(),
            )
            .map_err(Error::from_helper)?;
        }

        Ok(AttestationAction::Accept(ValidAttestation {
            data,
            attesting_indices: indices.as_slice().into(),
        }))
    }

    /// Applies an attestation previously validated using [`Self::validate_attestation`].
    pub fn apply_attestation(&mut self, valid_attestation: ValidAttestation) {
        self.update_latest_messages(valid_attestation);
        self.update_head();
    }

    // > Update latest messages for attesting indices
    fn update_latest_messages(&mut self, valid_attestation: ValidAttestation) {
        let ValidAttestation {
            data,
            attesting_indices,
        } = valid_attestation;

        let new_message = LatestMessage {
            epoch: data.target.epoch,
            root: data.beacon_block_root,
        };

        let mut differences = Self::difference_map();

        for validator_index in attesting_indices.iter().copied() {
            if self.equivocating_indices.contains(validator_index) {
                continue;
            }

            let old_message = self.latest_messages.get(&validator_index).copied();

            if old_message.is_some_and(|old_message| new_message.epoch <= old_message.epoch) {
                continue;
            }

            self.latest_messages.insert(validator_index, new_message);

            let balance = self.justified_active_balance(validator_index);

            if balance == 0 {
                continue;
            }

            if let Some(old_message) = old_message {
                let difference = differences.entry(old_message.root).or_default();
                *difference = difference.saturating_sub_unsigned(balance);
            }

            let difference = differences.entry(new_message.root).or_default();
            *difference = difference.saturating_add_unsigned(balance);
        }

        self.blocks.apply_differences(differences);
    }

    /// Roughly corresponds to [`on_attester_slashing`] from the Fork Choice specification.
    ///
    /// [`on_attester_slashing`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_attester_slashing
    pub fn on_attester_slashing(
        &mut self,
        attester_slashing: &AttesterSlashing,
        origin: AttesterSlashingOrigin,
    ) -> Result<()> {
        let slashable_indices = self.validate_attester_slashing(attester_slashing, origin)?;
        self.apply_attester_slashing(slashable_indices);
        Ok(())
    }

    /// Returns the indices of validators the slashing proves to have equivocated.
    pub fn validate_attester_slashing(
        &self,
        attester_slashing: &AttesterSlashing,
        origin: AttesterSlashingOrigin,
    ) -> Result<Vec<ValidatorIndex>> {
        let attestation_1 = &attester_slashing.attestation_1;
        let attestation_2 = &attester_slashing.attestation_2;

        let data_1 = attestation_1.data;
        let data_2 = attestation_2.data;

        ensure!(
            predicates::is_slashable_attestation_data(data_1, data_2),
            Error::NotSlashable { data_1, data_2 },
        );

        let state = self
            .blocks
            .chain_link(self.checkpoints.justified.root)
            .unwrap_or(&self.head)
            .state
            .as_ref();

        let verifier: &dyn Verifier = if origin.verify_signatures() {
            self.verifier.as_ref()
        } else {
            &NullVerifier
        };

        for attestation in [attestation_1, attestation_2] {
            predicates::validate_indexed_attestation(state, attestation, verifier)
                .map_err(Error::from_helper)?;
        }

        let slashable_indices = accessors::slashable_indices(attester_slashing).collect_vec();

        ensure!(!slashable_indices.is_empty(), Error::NoSlashableIndices);

        Ok(slashable_indices)
    }

    /// Applies indices previously returned by [`Self::validate_attester_slashing`].
    pub fn apply_attester_slashing(&mut self, slashable_indices: Vec<ValidatorIndex>) {
        self.insert_equivocating_indices(slashable_indices);
        self.update_head();
    }

    fn insert_equivocating_indices(&mut self, slashable_indices: Vec<ValidatorIndex>) {
        let new_indices = self.equivocating_indices.insert_all(slashable_indices);

        let mut differences = Self::difference_map();

        for validator_index in new_indices {
            let Some(latest_message) = self.latest_messages.get(&validator_index) else {
                continue;
            };

            let balance = self.justified_active_balance(validator_index);
            let difference = differences.entry(latest_message.root).or_default();
            *difference = difference.saturating_sub_unsigned(balance);
        }

        self.blocks.apply_differences(differences);
    }

    fn update_head(&mut self) {
        let new_head = self.compute_head();

        if new_head == self.head.block_root {
            return;
        }

        let Some(chain_link) = self.blocks.chain_link(new_head) else {
            return;
        };

        features::log!(
            DebugForkChoice,
            "head changed from {:?} (slot {}, weight {}) to {new_head:?} (slot {}, weight {})",
            self.head.block_root,
            self.head.slot(),
            self.weight(self.head.block_root),
            chain_link.slot(),
            self.weight(new_head),
        );

        self.head = chain_link.clone();
    }

    // Greedy descent from the justified block into the heaviest viable child.
    fn compute_head(&self) -> H256 {
        let justified_root = self.checkpoints.justified.root;

        let start = if self.blocks.contains(justified_root) {
            justified_root
        } else {
            self.blocks.root()
        };

        let viable = self.viable_blocks(start);
        let mut head = start;

        while let Some(best_child) = self
            .blocks
            .children(head)
            .filter(|child| viable.contains(child))
            .max_by_key(|child| self.score(*child))
        {
            head = best_child;
        }

        head
    }

    /// Roughly corresponds to [`filter_block_tree`] from the Fork Choice specification.
    ///
    /// Returns the blocks in the subtree rooted at `start` that have viable leaves among their
    /// descendants.
    ///
    /// [`filter_block_tree`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#filter_block_tree
    fn viable_blocks(&self, start: H256) -> HashedSet<H256> {
        let mut preorder = vec![];
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            preorder.push(current);
            stack.extend(self.blocks.children(current));
        }

        let mut viable = HashedSet::default();

        // Descendants come after their ancestors in preorder.
        for block_root in preorder.into_iter().rev() {
            let mut children = self.blocks.children(block_root).peekable();

            let is_viable = if children.peek().is_none() {
                self.is_leaf_viable(block_root)
            } else {
                children.any(|child| viable.contains(&child))
            };

            if is_viable {
                viable.insert(block_root);
            }
        }

        viable
    }

    fn is_leaf_viable(&self, block_root: H256) -> bool {
        let Some(chain_link) = self.blocks.chain_link(block_root) else {
            return false;
        };

        let justified = self.checkpoints.justified;
        let finalized = self.checkpoints.finalized;

        match self.chain_config.justification_rule {
            JustificationRule::PullUpTip => {
                let current_epoch = self.current_epoch();
                let voting_source = self.voting_source(chain_link);

                // > The voting source should be either at the same height as the store's
                // > justified checkpoint or not more than two epochs ago
                let correct_justified = justified.epoch == GENESIS_EPOCH
                    || voting_source.epoch == justified.epoch
                    || (justified.epoch + 1 == current_epoch
                        && chain_link.unrealized_justified_checkpoint.epoch >= justified.epoch
                        && voting_source.epoch + 2 >= current_epoch);

                let finalized_slot =
                    misc::compute_start_slot_at_epoch(&self.chain_config, finalized.epoch);

                let correct_finalized = finalized.epoch == GENESIS_EPOCH
                    || self.blocks.ancestor(block_root, finalized_slot) == Some(finalized.root);

                correct_justified && correct_finalized
            }
            JustificationRule::SafeSlots => {
                let correct_justified = justified.epoch == GENESIS_EPOCH
                    || chain_link.current_justified_checkpoint() == justified;

                let correct_finalized = finalized.epoch == GENESIS_EPOCH
                    || chain_link.finalized_checkpoint() == finalized;

                correct_justified && correct_finalized
            }
        }
    }

    // > If the block is from a prior epoch, use its unrealized justification as the voting source
    fn voting_source(&self, chain_link: &ChainLink) -> Checkpoint {
        if chain_link.epoch(&self.chain_config) < self.current_epoch() {
            chain_link.unrealized_justified_checkpoint
        } else {
            chain_link.current_justified_checkpoint()
        }
    }

    fn difference_map() -> HashedMap<H256, Difference> {
        // Block roots are already hashes.
        HashedMap::default()
    }

    #[must_use]
    pub fn anchor_slot(&self) -> Slot {
        self.blocks
            .chain_link(self.blocks.root())
            .map_or(GENESIS_SLOT, ChainLink::slot)
    }
}
