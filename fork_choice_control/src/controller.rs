// Instead of mutating `Store` directly, the `on_*` methods send messages to a dedicated mutator
// thread. Query methods operate on a recent but potentially out-of-date snapshot of `Store`.
// This serves to accomplish 2 things:
// - Query methods do not need to wait.
// - The `on_*` methods return quickly and can thus be called from `async` tasks.
//
// Messages are handled strictly in the order they were sent. All of them pass through the same
// `Store`, so there is no way for concurrent callers to observe or cause partial updates.

use core::panic::AssertUnwindSafe;
use std::{
    sync::{mpsc::Sender, Arc},
    thread::{Builder, JoinHandle},
};

use anyhow::{Context as _, Result};
use arc_swap::{ArcSwap, Guard};
use fork_choice_store::{AttesterSlashingOrigin, Store, StoreConfig};
use helper_functions::verifier::Verifier;
use prometheus_metrics::Metrics;
use thiserror::Error;
use transition_functions::StateTransition;
use types::{
    beacon_state::BeaconState,
    config::Config as ChainConfig,
    containers::{Attestation, AttesterSlashing, SignedBeaconBlock},
    primitives::UnixSeconds,
};

use crate::{
    events::Event,
    messages::MutatorMessage,
    misc,
    mutator::Mutator,
    scheduler::Scheduler,
    unbounded_sink::UnboundedSink,
    wait::Wait,
};

pub struct Controller<W: Wait> {
    // The latest consistent snapshot of the store.
    store_snapshot: Arc<ArcSwap<Store>>,
    wait_group: W::Swappable,
    metrics: Option<Arc<Metrics>>,
    mutator_tx: Sender<MutatorMessage<W>>,
}

impl<W: Wait> Drop for Controller<W> {
    fn drop(&mut self) {
        MutatorMessage::Stop.send(&self.mutator_tx);
    }
}

impl<W: Wait> Controller<W> {
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        transition: Arc<dyn StateTransition>,
        verifier: Arc<dyn Verifier>,
        anchor_block: Arc<SignedBeaconBlock>,
        anchor_state: Arc<BeaconState>,
        time: UnixSeconds,
        metrics: Option<Arc<Metrics>>,
        event_tx: impl UnboundedSink<Event>,
        unfinalized_blocks: impl IntoIterator<Item = Arc<SignedBeaconBlock>>,
    ) -> Result<(Arc<Self>, MutatorHandle<W>)> {
        let store = Store::new(
            chain_config,
            store_config,
            transition,
            verifier,
            anchor_block,
            anchor_state,
        )?;

        let store_snapshot = Arc::new(ArcSwap::from_pointee(store.clone()));
        let (mutator_tx, mutator_rx) = std::sync::mpsc::channel();

        let mut mutator = Mutator::new(
            Scheduler::new(store),
            Arc::clone(&store_snapshot),
            event_tx,
            metrics.clone(),
            mutator_rx,
        );

        mutator.process_unfinalized_blocks(time, unfinalized_blocks)?;

        let join_handle = Builder::new().name("store-mutator".to_owned()).spawn(|| {
            // The closure should be unwind safe.
            // The instance of `Store` used by the mutator may become inconsistent but cannot be
            // observed because the shared snapshot is only updated with values that are consistent.
            std::panic::catch_unwind(AssertUnwindSafe(move || mutator.run()))
                .map_err(misc::payload_into_error)
                .context(Error::MutatorPanicked)?
                .context(Error::MutatorFailed)
        })?;

        let controller = Arc::new(Self {
            store_snapshot,
            wait_group: W::Swappable::default(),
            metrics,
            mutator_tx: mutator_tx.clone(),
        });

        let mutator_handle = MutatorHandle {
            join_handle: Some(join_handle),
            mutator_tx,
        };

        Ok((controller, mutator_handle))
    }

    pub fn on_tick(&self, time: UnixSeconds) {
        MutatorMessage::Tick {
            wait_group: self.owned_wait_group(),
            time,
        }
        .send(&self.mutator_tx);
    }

    pub fn on_block(&self, block: Arc<SignedBeaconBlock>) {
        MutatorMessage::Block {
            wait_group: self.owned_wait_group(),
            block,
        }
        .send(&self.mutator_tx);
    }

    pub fn on_attestation(&self, attestation: Arc<Attestation>) {
        MutatorMessage::Attestation {
            wait_group: self.owned_wait_group(),
            attestation,
        }
        .send(&self.mutator_tx);
    }

    pub fn on_attester_slashing(&self, attester_slashing: Box<AttesterSlashing>) {
        MutatorMessage::AttesterSlashing {
            wait_group: self.owned_wait_group(),
            attester_slashing,
            origin: AttesterSlashingOrigin::Gossip,
        }
        .send(&self.mutator_tx);
    }

    #[must_use]
    pub fn metrics(&self) -> Option<&Arc<Metrics>> {
        self.metrics.as_ref()
    }

    pub(crate) fn store_snapshot(&self) -> Guard<Arc<Store>> {
        self.store_snapshot.load()
    }

    #[must_use]
    pub fn owned_store_snapshot(&self) -> Arc<Store> {
        self.store_snapshot.load_full()
    }

    pub(crate) const fn wait_group(&self) -> &W::Swappable {
        &self.wait_group
    }

    fn owned_wait_group(&self) -> W {
        Wait::load_and_clone(&self.wait_group)
    }
}

/// A wrapper over [`JoinHandle`] that can be used to wait for the mutator thread to finish.
///
/// In normal operation the mutator thread should be joined explicitly using
/// [`MutatorHandle::join`]. Tests and benchmarks may drop [`MutatorHandle`],
/// at which point the mutator thread will be joined implicitly.
pub struct MutatorHandle<W> {
    join_handle: Option<JoinHandle<Result<()>>>,
    mutator_tx: Sender<MutatorMessage<W>>,
}

impl<W> Drop for MutatorHandle<W> {
    fn drop(&mut self) {
        // Stop the mutator thread to avoid a deadlock if the corresponding `Controller` hasn't been
        // dropped yet. This only matters in tests and benchmarks. In normal operation `Controller`
        // and `MutatorHandle` are owned by different tasks, so their drop order is independent.
        MutatorMessage::Stop.send(&self.mutator_tx);

        if let Err(error) = self.join_internal() {
            log::error!("mutator thread failed: {error:?}");
        }
    }
}

impl<W> MutatorHandle<W> {
    pub fn join(mut self) -> Result<()> {
        self.join_internal()
    }

    fn join_internal(&mut self) -> Result<()> {
        // `MutatorHandle::join_internal` is called twice when joined explicitly.
        let Some(join_handle) = self.join_handle.take() else {
            return Ok(());
        };

        // The mutator thread catches its own panics. Panics escaping it would come from logging.
        join_handle
            .join()
            .map_err(misc::payload_into_error)
            .context(Error::MutatorPanicked)?
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("mutator panicked")]
    MutatorPanicked,
    #[error("mutator failed")]
    MutatorFailed,
}
