//! Deferral and retrying of messages that cannot be processed yet.
//!
//! A message is early if it is from a future slot or refers to a block the store has not seen.
//! Early messages are queued and retried whenever the store changes in a way that may make them
//! acceptable: after a block is accepted and after every slot boundary. Retrying stops once a full
//! pass over the queue makes no progress. Each successful pass inserts at least one block or vote,
//! so retrying always terminates.

use std::{collections::VecDeque, sync::Arc};

use anyhow::{Error as AnyhowError, Result};
use clock::Tick;
use fork_choice_store::{
    AttestationOrigin, AttesterSlashingOrigin, Error, ErrorKind, Store,
};
use log::{debug, warn};
use types::{
    containers::{Attestation, AttesterSlashing, SignedBeaconBlock},
    primitives::{Slot, UnixSeconds, H256},
    traits::SszHash as _,
};

#[derive(Clone, Debug)]
pub enum QueueItem {
    Block(Arc<SignedBeaconBlock>),
    Attestation(Arc<Attestation>),
}

impl QueueItem {
    /// The first slot in which the message can affect fork choice.
    #[must_use]
    pub fn effective_slot(&self) -> Slot {
        match self {
            Self::Block(block) => block.slot(),
            // > Attestations can only affect the fork choice of subsequent slots.
            Self::Attestation(attestation) => attestation.data.slot.saturating_add(1),
        }
    }

    /// Roots of blocks that must be in the store before the message can be processed.
    #[must_use]
    pub fn dependencies(&self) -> Vec<H256> {
        match self {
            Self::Block(block) => vec![block.parent_root()],
            Self::Attestation(attestation) => {
                let data = attestation.data;
                vec![data.beacon_block_root, data.target.root]
            }
        }
    }

    #[must_use]
    pub fn is_early(&self, store: &Store) -> bool {
        self.effective_slot() > store.slot()
            || self
                .dependencies()
                .into_iter()
                .any(|root| !store.contains_block(root))
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Block(_) => "block",
            Self::Attestation(_) => "attestation",
        }
    }

    fn submit(&self, store: &mut Store) -> Result<()> {
        match self {
            Self::Block(block) => store.on_block(block),
            Self::Attestation(attestation) => {
                store.on_attestation(attestation, AttestationOrigin::Gossip)
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Accepted,
    Delayed,
}

/// A message that was delayed and later turned out to be unacceptable.
#[derive(Debug)]
pub struct Rejection {
    pub item: QueueItem,
    pub error: AnyhowError,
}

/// Owns the [`Store`] and feeds it messages in an order it can accept.
#[derive(Clone, Debug)]
pub struct Scheduler {
    store: Store,
    queue: VecDeque<QueueItem>,
    rejections: Vec<Arc<Rejection>>,
}

impl Scheduler {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self {
            store,
            queue: VecDeque::new(),
            rejections: vec![],
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued(&self) -> impl Iterator<Item = &QueueItem> {
        self.queue.iter()
    }

    /// Returns messages rejected while retrying since the last call.
    pub fn take_rejections(&mut self) -> Vec<Arc<Rejection>> {
        core::mem::take(&mut self.rejections)
    }

    pub fn on_block(&mut self, block: Arc<SignedBeaconBlock>) -> Result<Outcome> {
        let outcome = self.submit(QueueItem::Block(block))?;

        if outcome == Outcome::Accepted {
            self.purge_queue();
        }

        Ok(outcome)
    }

    pub fn on_attestation(&mut self, attestation: Arc<Attestation>) -> Result<Outcome> {
        self.submit(QueueItem::Attestation(attestation))
    }

    /// Attester slashings have no dependencies and are never delayed.
    pub fn on_attester_slashing(
        &mut self,
        attester_slashing: &AttesterSlashing,
        origin: AttesterSlashingOrigin,
    ) -> Result<()> {
        self.store.on_attester_slashing(attester_slashing, origin)
    }

    /// Advances the store to `time` one slot at a time, retrying delayed messages after every
    /// slot boundary.
    pub fn process_tick(&mut self, time: UnixSeconds) -> Result<()> {
        if time <= self.store.time() {
            return Ok(());
        }

        let config = self.store.chain_config();
        let genesis_time = self.store.genesis_time();
        let new_tick = Tick::at_time(config, time, genesis_time)?;

        while self.store.slot() < new_tick.slot {
            let next_slot = Tick::start_of_slot(self.store.slot() + 1);
            let slot_start = next_slot.time(self.store.chain_config(), genesis_time);

            self.store.on_tick(slot_start)?;
            self.purge_queue();
        }

        self.store.on_tick(time)?;
        self.purge_queue();

        Ok(())
    }

    /// Makes a single pass over the queue. Returns `true` if any message was accepted.
    pub fn process_queue(&mut self) -> bool {
        let mut progress = false;

        for item in core::mem::take(&mut self.queue) {
            if item.is_early(&self.store) {
                self.queue.push_back(item);
                continue;
            }

            match item.submit(&mut self.store) {
                Ok(()) => progress = true,
                Err(error) => match ErrorKind::of(&error) {
                    ErrorKind::Early => self.queue.push_back(item),
                    ErrorKind::Ignored => {
                        debug!("delayed {} is no longer useful: {error}", item.kind());
                    }
                    ErrorKind::Invalid => {
                        warn!("delayed {} rejected: {error}", item.kind());
                        self.rejections.push(Arc::new(Rejection { item, error }));
                    }
                },
            }
        }

        progress
    }

    /// Retries delayed messages until no more of them can be accepted.
    pub fn purge_queue(&mut self) {
        while !self.queue.is_empty() && self.process_queue() {}
    }

    // The store decides whether a new message is early. Features may make it drop messages
    // that would otherwise be delayed.
    fn submit(&mut self, item: QueueItem) -> Result<Outcome> {
        match item.submit(&mut self.store) {
            Ok(()) => Ok(Outcome::Accepted),
            Err(error) => match error.downcast_ref::<Error>() {
                Some(store_error) if store_error.is_early() => {
                    self.enqueue(item);
                    Ok(Outcome::Delayed)
                }
                _ => Err(error),
            },
        }
    }

    fn enqueue(&mut self, item: QueueItem) {
        let max_queued_messages = self.store.store_config().max_queued_messages;

        if max_queued_messages == 0 {
            debug!("dropping {} because delaying messages is disabled", item.kind());
            return;
        }

        while self.queue.len() >= max_queued_messages {
            if let Some(dropped) = self.queue.pop_front() {
                debug!(
                    "queue is full; dropping oldest delayed {} (effective slot {})",
                    dropped.kind(),
                    dropped.effective_slot(),
                );
            }
        }

        if let QueueItem::Block(block) = &item {
            debug!(
                "delaying block {:?} (slot {}, parent {:?})",
                block.message.hash_tree_root(),
                block.slot(),
                block.parent_root(),
            );
        }

        self.queue.push_back(item);
    }
}
