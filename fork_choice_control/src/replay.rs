//! Replaying recorded messages in perturbed orders.
//!
//! Fork choice must reach the same head regardless of the order in which messages arrive, as long
//! as every message is eventually delivered. The operators here take a list of [`TimedEvent`]s and
//! produce variations of it using a seeded RNG, so failures can be reproduced from the seed alone.

use std::sync::Arc;

use anyhow::Result;
use fork_choice_store::AttesterSlashingOrigin;
use log::debug;
use rand::{rngs::StdRng, seq::SliceRandom as _, Rng as _, SeedableRng as _};
use serde::{Deserialize, Serialize};
use types::{
    containers::{Attestation, AttesterSlashing, SignedBeaconBlock},
    primitives::UnixSeconds,
};

use crate::scheduler::Scheduler;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    Tick,
    Block(Arc<SignedBeaconBlock>),
    Attestation(Arc<Attestation>),
    AttesterSlashing(Box<AttesterSlashing>),
}

/// A message along with the time it was received.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimedEvent {
    pub time: UnixSeconds,
    pub message: Message,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mutation {
    Shuffle,
    Duplicate,
    Delay { max_delay: UnixSeconds },
}

impl Mutation {
    #[must_use]
    pub fn apply(self, events: Vec<TimedEvent>, seed: u64) -> Vec<TimedEvent> {
        let mut rng = StdRng::seed_from_u64(seed);

        match self {
            Self::Shuffle => shuffle(events, &mut rng),
            Self::Duplicate => duplicate(events, &mut rng),
            Self::Delay { max_delay } => delay(events, &mut rng, max_delay),
        }
    }
}

/// Delivers events in random order.
///
/// Times are left unchanged, so events may be delivered before their time has come. The store's
/// clock never goes backwards, which means events may also be delivered late.
#[must_use]
pub fn shuffle(mut events: Vec<TimedEvent>, rng: &mut StdRng) -> Vec<TimedEvent> {
    events.shuffle(rng);
    events
}

/// Delivers some events twice.
#[must_use]
pub fn duplicate(events: Vec<TimedEvent>, rng: &mut StdRng) -> Vec<TimedEvent> {
    let mut duplicated = Vec::with_capacity(events.len() * 2);

    for event in events {
        if rng.gen_bool(0.5) {
            duplicated.push(event.clone());
        }

        duplicated.push(event);
    }

    let len = duplicated.len();
    duplicated.rotate_right(rng.gen_range(0..len.max(1)));
    duplicated.sort_by_key(|event| event.time);
    duplicated
}

/// Delays each event by up to `max_delay` seconds, keeping them sorted by time.
#[must_use]
pub fn delay(
    mut events: Vec<TimedEvent>,
    rng: &mut StdRng,
    max_delay: UnixSeconds,
) -> Vec<TimedEvent> {
    for event in &mut events {
        event.time += rng.gen_range(0..=max_delay);
    }

    events.sort_by_key(|event| event.time);
    events
}

/// Feeds events to `scheduler` in order, advancing its clock to the time of each one first.
///
/// Rejected messages are logged and skipped.
pub fn replay(
    scheduler: &mut Scheduler,
    events: impl IntoIterator<Item = TimedEvent>,
) -> Result<()> {
    for TimedEvent { time, message } in events {
        scheduler.process_tick(time)?;

        let result = match message {
            Message::Tick => continue,
            Message::Block(block) => scheduler.on_block(block).map(drop),
            Message::Attestation(attestation) => scheduler.on_attestation(attestation).map(drop),
            Message::AttesterSlashing(attester_slashing) => {
                scheduler.on_attester_slashing(&attester_slashing, AttesterSlashingOrigin::Gossip)
            }
        };

        if let Err(error) = result {
            debug!("replayed message rejected at time {time}: {error:#}");
        }
    }

    for rejection in scheduler.take_rejections() {
        debug!("replayed {} rejected: {:#}", rejection.item.kind(), rejection.error);
    }

    Ok(())
}
