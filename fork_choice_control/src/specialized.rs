use core::ops::DerefMut as _;
use std::sync::{Arc, PoisonError};

use anyhow::Result;
use crossbeam_utils::sync::WaitGroup;
use fork_choice_store::StoreConfig;
use helper_functions::verifier::Verifier;
use prometheus_metrics::Metrics;
use tap::Pipe as _;
use transition_functions::{Phase0Transition, StateRootPolicy};
use types::{
    beacon_state::BeaconState, config::Config as ChainConfig, containers::SignedBeaconBlock,
    primitives::Slot,
};

use crate::{
    controller::{Controller, MutatorHandle},
    events::Event,
    unbounded_sink::UnboundedSink,
};

pub type AdHocBenchController = Controller<WaitGroup>;

#[cfg(test)]
pub type TestController = Controller<WaitGroup>;

impl Controller<WaitGroup> {
    /// Creates a controller that starts at the anchor block's slot and uses the reference state
    /// transition.
    pub fn with_reference_transition(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        verifier: Arc<dyn Verifier>,
        anchor_block: Arc<SignedBeaconBlock>,
        anchor_state: Arc<BeaconState>,
        metrics: Option<Arc<Metrics>>,
        event_tx: impl UnboundedSink<Event>,
    ) -> Result<(Arc<Self>, MutatorHandle<WaitGroup>)> {
        let transition = Arc::new(Phase0Transition::new(
            Arc::clone(&chain_config),
            StateRootPolicy::Verify,
        ));

        let time = anchor_state.genesis_time
            + anchor_block.slot() * chain_config.seconds_per_slot.get();

        Self::new(
            chain_config,
            store_config,
            transition,
            verifier,
            anchor_block,
            anchor_state,
            time,
            metrics,
            event_tx,
            [],
        )
    }

    pub fn on_slot(&self, slot: Slot) {
        let time = self.genesis_time()
            + slot * self.owned_store_snapshot().chain_config().seconds_per_slot.get();

        self.on_tick(time);
    }

    /// Waits until all messages sent so far are handled.
    ///
    /// This is intended for use in tests and benchmarks.
    /// [`WaitGroup`] is not used in normal operation because it adds some overhead.
    pub fn wait_for_tasks(&self) {
        let wait_group = self
            .wait_group()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deref_mut()
            .pipe(core::mem::take);

        wait_group.wait()
    }
}
