use std::sync::Arc;

use anyhow::Result;
use crossbeam_utils::sync::WaitGroup;
use fork_choice_store::StoreConfig;
use futures::channel::mpsc::UnboundedReceiver;
use helper_functions::verifier::DigestVerifier;
use types::{
    beacon_state::BeaconState,
    config::Config,
    containers::{Attestation, AttesterSlashing, Checkpoint, SignedBeaconBlock},
    primitives::{Epoch, Slot, UnixSeconds, H256},
    traits::SszHash as _,
};
use unwrap_none::UnwrapNone as _;

use crate::{controller::MutatorHandle, events::Event, specialized::TestController};

pub type BlockWithState = (Arc<SignedBeaconBlock>, Arc<BeaconState>);

pub struct Context {
    config: Arc<Config>,
    genesis_block: Arc<SignedBeaconBlock>,
    genesis_state: Arc<BeaconState>,
    controller: Option<Arc<TestController>>,
    // Dropped after `controller`, at which point the mutator thread is joined.
    mutator_handle: Option<MutatorHandle<WaitGroup>>,
    event_rx: UnboundedReceiver<Event>,
    received_events: Vec<Event>,
}

impl Drop for Context {
    fn drop(&mut self) {
        self.controller.take();

        if let Some(mutator_handle) = self.mutator_handle.take() {
            let result = mutator_handle.join();

            if !std::thread::panicking() {
                result.expect("mutator thread should not fail in tests");
            }
        }
    }
}

impl Context {
    pub fn minimal() -> Result<Self> {
        Self::new(Config::minimal(), StoreConfig::default())
    }

    pub fn new(config: Config, store_config: StoreConfig) -> Result<Self> {
        let config = Arc::new(config);
        let genesis_state = factory::min_genesis_state(&config);
        let genesis_block = factory::genesis_block(&genesis_state);
        let (event_tx, event_rx) = futures::channel::mpsc::unbounded();

        let (controller, mutator_handle) = TestController::with_reference_transition(
            Arc::clone(&config),
            store_config,
            Arc::new(DigestVerifier),
            Arc::clone(&genesis_block),
            Arc::clone(&genesis_state),
            None,
            event_tx,
        )?;

        Ok(Self {
            config,
            genesis_block,
            genesis_state,
            controller: Some(controller),
            mutator_handle: Some(mutator_handle),
            event_rx,
            received_events: vec![],
        })
    }

    #[must_use]
    pub fn controller(&self) -> &TestController {
        self.controller
            .as_ref()
            .expect("Context.controller is only taken in Drop::drop")
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    #[must_use]
    pub fn genesis(&self) -> BlockWithState {
        (
            Arc::clone(&self.genesis_block),
            Arc::clone(&self.genesis_state),
        )
    }

    #[must_use]
    pub fn genesis_root(&self) -> H256 {
        self.genesis_block.message.hash_tree_root()
    }

    #[must_use]
    pub fn slot_time(&self, slot: Slot) -> UnixSeconds {
        factory::GENESIS_TIME + slot * self.config.seconds_per_slot.get()
    }

    /// Builds a chain of full blocks on top of genesis without submitting them.
    pub fn full_chain(&self, last_slot: Slot) -> Result<Vec<BlockWithState>> {
        let mut parent = self.genesis();
        let mut chain = vec![];

        for slot in 1..=last_slot {
            parent = factory::full_block(&self.config, parent.1, slot, H256::zero())?;
            chain.push(parent.clone());
        }

        Ok(chain)
    }

    pub fn on_slot(&mut self, slot: Slot) {
        self.on_time(self.slot_time(slot));
    }

    pub fn on_time(&mut self, time: UnixSeconds) {
        self.controller().on_tick(time);
        self.controller().wait_for_tasks();
    }

    pub fn on_acceptable_block(&mut self, block: &Arc<SignedBeaconBlock>) {
        self.on_block(block);

        assert!(self.controller().contains_block(block.message.hash_tree_root()));
        self.next_rejection().unwrap_none();
    }

    pub fn on_delayed_block(&mut self, block: &Arc<SignedBeaconBlock>) {
        self.on_block(block);

        assert!(!self.controller().contains_block(block.message.hash_tree_root()));
        self.next_rejection().unwrap_none();
    }

    pub fn on_invalid_block(&mut self, block: &Arc<SignedBeaconBlock>) {
        self.on_block(block);

        assert!(!self.controller().contains_block(block.message.hash_tree_root()));
        assert!(self.next_rejection().is_some());
    }

    pub fn on_attestation(&mut self, attestation: Attestation) {
        self.controller().on_attestation(Arc::new(attestation));
        self.controller().wait_for_tasks();
    }

    pub fn on_attester_slashing(&mut self, attester_slashing: AttesterSlashing) {
        self.controller()
            .on_attester_slashing(Box::new(attester_slashing));

        self.controller().wait_for_tasks();
    }

    /// Returns events received since the last call to this or [`Self::take_events`].
    pub fn take_events(&mut self) -> Vec<Event> {
        self.poll_events();
        core::mem::take(&mut self.received_events)
    }

    pub fn next_rejection(&mut self) -> Option<Event> {
        self.poll_events()
            .iter()
            .find(|event| matches!(event, Event::Rejected(_)))
            .cloned()
    }

    // Returns only the events received by this call.
    fn poll_events(&mut self) -> &[Event] {
        let old_len = self.received_events.len();

        while let Ok(Some(event)) = self.event_rx.try_next() {
            self.received_events.push(event);
        }

        &self.received_events[old_len..]
    }

    pub fn assert_head(&self, expected: H256) {
        assert_eq!(self.controller().head_root(), expected);
    }

    pub fn assert_head_block(&self, block: &SignedBeaconBlock) {
        self.assert_head(block.message.hash_tree_root());
    }

    pub fn assert_justified_epoch(&self, expected: Epoch) {
        assert_eq!(self.controller().justified_checkpoint().epoch, expected);
    }

    pub fn assert_finalized_checkpoint(&self, expected: Checkpoint) {
        assert_eq!(self.controller().finalized_checkpoint(), expected);
    }

    fn on_block(&self, block: &Arc<SignedBeaconBlock>) {
        self.controller().on_block(Arc::clone(block));
        self.controller().wait_for_tasks();
    }
}
