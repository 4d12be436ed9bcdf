//! The single owner of the fork choice store.
//!
//! The mutator thread receives messages from [`Controller`]s, feeds them to the [`Scheduler`] one
//! at a time and publishes a snapshot of the store after each one. It also compares consecutive
//! snapshots to produce [`Event`]s and update metrics.
//!
//! [`Controller`]: crate::Controller

use std::{
    sync::{mpsc::Receiver, Arc},
    time::Instant,
};

use anyhow::Result;
use arc_swap::ArcSwap;
use fork_choice_store::{ErrorKind, Store};
use log::{debug, info, warn};
use prometheus_metrics::Metrics;
use types::{containers::SignedBeaconBlock, primitives::UnixSeconds, traits::SszHash as _};

use crate::{
    events::{
        CheckpointEvent, ConfirmationEvent, Event, HeadEvent, ReorganizationEvent, RejectionEvent,
    },
    messages::MutatorMessage,
    scheduler::{Outcome, Scheduler},
    unbounded_sink::UnboundedSink,
    wait::Wait,
};

pub struct Mutator<W, E> {
    scheduler: Scheduler,
    store_snapshot: Arc<ArcSwap<Store>>,
    event_tx: E,
    metrics: Option<Arc<Metrics>>,
    mutator_rx: Receiver<MutatorMessage<W>>,
}

impl<W: Wait, E: UnboundedSink<Event>> Mutator<W, E> {
    pub fn new(
        scheduler: Scheduler,
        store_snapshot: Arc<ArcSwap<Store>>,
        event_tx: E,
        metrics: Option<Arc<Metrics>>,
        mutator_rx: Receiver<MutatorMessage<W>>,
    ) -> Self {
        Self {
            scheduler,
            store_snapshot,
            event_tx,
            metrics,
            mutator_rx,
        }
    }

    pub fn run(mut self) -> Result<()> {
        loop {
            // `Controller` and `MutatorHandle` both send `Stop` when dropped.
            // The channel can only be disconnected if both were leaked.
            let Ok(message) = self.mutator_rx.recv() else {
                break Ok(());
            };

            let kind = message.kind();

            let timer = self.metrics.as_ref().and_then(|metrics| {
                prometheus_metrics::start_timer_vec(&metrics.fc_message_times, kind)
            });

            let wait_group = match message {
                MutatorMessage::Tick { wait_group, time } => {
                    self.handle_tick(time)?;
                    wait_group
                }
                MutatorMessage::Block { wait_group, block } => {
                    let block_root = block.message.hash_tree_root();
                    let slot = block.slot();
                    let started_at = Instant::now();
                    let result = self.scheduler.on_block(block);

                    features::log!(
                        LogBlockProcessingTime,
                        "block {block_root:?} at slot {slot} processed in {:?}",
                        started_at.elapsed(),
                    );

                    self.handle_outcome(kind, result, || format!("block {block_root:?}"));
                    wait_group
                }
                MutatorMessage::Attestation {
                    wait_group,
                    attestation,
                } => {
                    let data = attestation.data;
                    let result = self.scheduler.on_attestation(attestation);
                    self.handle_outcome(kind, result, || format!("attestation {data:?}"));
                    wait_group
                }
                MutatorMessage::AttesterSlashing {
                    wait_group,
                    attester_slashing,
                    origin,
                } => {
                    let result = self
                        .scheduler
                        .on_attester_slashing(&attester_slashing, origin)
                        .map(|()| Outcome::Accepted);

                    self.handle_outcome(kind, result, || "attester slashing".to_owned());
                    wait_group
                }
                MutatorMessage::Stop => {
                    prometheus_metrics::stop_and_discard(timer);
                    break Ok(());
                }
            };

            self.update_store_snapshot();

            prometheus_metrics::stop_and_record(timer);

            // Dropping the wait group last ensures waiting callers observe the new snapshot.
            drop(wait_group);
        }
    }

    /// Replays blocks retained from before a restart.
    ///
    /// Invalid blocks are skipped. They may have been retained before a fork choice rule change.
    pub fn process_unfinalized_blocks(
        &mut self,
        time: UnixSeconds,
        blocks: impl IntoIterator<Item = Arc<SignedBeaconBlock>>,
    ) -> Result<()> {
        self.handle_tick(time)?;

        for block in blocks {
            let block_root = block.message.hash_tree_root();

            if let Err(error) = self.scheduler.on_block(block) {
                warn!("unfinalized block {block_root:?} could not be replayed: {error:#}");
            }
        }

        self.update_store_snapshot();

        Ok(())
    }

    fn handle_tick(&mut self, time: UnixSeconds) -> Result<()> {
        self.scheduler.process_tick(time)?;
        self.report_rejections();
        Ok(())
    }

    fn handle_outcome(
        &mut self,
        kind: &'static str,
        result: Result<Outcome>,
        describe: impl FnOnce() -> String,
    ) {
        let outcome = match result {
            Ok(Outcome::Accepted) => "accepted",
            Ok(Outcome::Delayed) => {
                debug!("{} delayed", describe());
                "delayed"
            }
            Err(error) => match ErrorKind::of(&error) {
                ErrorKind::Ignored => {
                    debug!("{} ignored: {error:#}", describe());
                    "ignored"
                }
                ErrorKind::Early | ErrorKind::Invalid => {
                    warn!("{} rejected: {error:#}", describe());

                    Event::Rejected(RejectionEvent {
                        kind,
                        effective_slot: self.scheduler.store().slot(),
                        reason: format!("{error:#}"),
                    })
                    .send(&self.event_tx);

                    "rejected"
                }
            },
        };

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.register_mutator_message(kind, outcome);
        }

        self.report_rejections();
    }

    fn report_rejections(&mut self) {
        for rejection in self.scheduler.take_rejections() {
            if let Some(metrics) = self.metrics.as_ref() {
                metrics.register_mutator_message(rejection.item.kind(), "rejected");
            }

            Event::Rejected(RejectionEvent::from(rejection.as_ref())).send(&self.event_tx);
        }
    }

    fn update_store_snapshot(&self) {
        let old_store = self.store_snapshot.load_full();
        let new_store = Arc::new(self.scheduler.store().clone());

        self.store_snapshot.store(Arc::clone(&new_store));

        self.report_changes(&old_store, &new_store);
    }

    fn report_changes(&self, old_store: &Store, new_store: &Store) {
        let old_head = old_store.head();
        let new_head = new_store.head();

        if old_head.block_root != new_head.block_root {
            let head_event = HeadEvent::new(new_store, old_head);

            features::log!(
                DebugForkChoice,
                "head changed from {:?} (weight {}) to {:?} (weight {})",
                old_head.block_root,
                new_store.weight(old_head.block_root),
                new_head.block_root,
                new_store.weight(new_head.block_root),
            );

            if let Some(reorganization) = ReorganizationEvent::new(new_store, old_head) {
                info!(
                    "chain reorganized at slot {} with depth {} (old head: {:?}, new head: {:?})",
                    reorganization.slot,
                    reorganization.depth,
                    reorganization.old_head_block,
                    reorganization.new_head_block,
                );

                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.register_reorg();
                }

                Event::Reorganized(reorganization).send(&self.event_tx);
            }

            Event::Head(head_event).send(&self.event_tx);
        }

        let old_justified = old_store.justified_checkpoint();
        let new_justified = new_store.justified_checkpoint();

        if old_justified != new_justified {
            info!(
                "justified checkpoint updated (epoch: {}, root: {:?})",
                new_justified.epoch, new_justified.root,
            );

            Event::Justified(CheckpointEvent::from(new_justified)).send(&self.event_tx);
        }

        let old_finalized = old_store.finalized_checkpoint();
        let new_finalized = new_store.finalized_checkpoint();

        if old_finalized != new_finalized {
            info!(
                "finalized checkpoint updated (epoch: {}, root: {:?})",
                new_finalized.epoch, new_finalized.root,
            );

            Event::Finalized(CheckpointEvent::from(new_finalized)).send(&self.event_tx);
        }

        let new_confirmed = new_store
            .confirmed_root()
            .filter(|root| Some(*root) != old_store.confirmed_root());

        if let Some(block_root) = new_confirmed {
            let slot = new_store
                .chain_link(block_root)
                .map_or_else(|| new_store.anchor_slot(), |chain_link| chain_link.slot());

            debug!("block {block_root:?} at slot {slot} confirmed");

            if let Some(metrics) = self.metrics.as_ref() {
                metrics.set_confirmed_slot(slot);
            }

            Event::Confirmed(ConfirmationEvent {
                slot,
                block: block_root,
            })
            .send(&self.event_tx);
        }

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_head_slot(new_head.slot());
            metrics.set_justified_epoch(new_justified.epoch);
            metrics.set_finalized_epoch(new_finalized.epoch);
            metrics.set_queue_length(self.scheduler.queue_len());
        }
    }
}
