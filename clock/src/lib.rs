//! A [`Stream`]-based timer for the beacon chain.
//!
//! Every slot is divided into intervals, one per [`TickKind`]. A [`Tick`] is produced at the start
//! of each interval.
//!
//! # Implementation
//!
//! This is implemented using [`Interval`]. Some subtleties to keep in mind:
//!
//! - The API of [`Interval`] uses [`Instant`]s. [`Instant`]s are opaque. There is no way to
//!   directly convert a timestamp to an [`Instant`]. The hack in [`ticks`] may result in
//!   unexpected behavior in extreme conditions.
//!
//! - An [`Interval`] may produce items late, but the delays do not accumulate by default.
//!
//! - It is unclear how [`Interval`] behaves around leap seconds.
//!
//! [`Instant`]:  tokio::time::Instant
//! [`Interval`]: tokio::time::Interval

use core::{error::Error, time::Duration};
use std::time::{Instant, SystemTime, SystemTimeError};

use anyhow::Result;
use enum_iterator::Sequence;
use futures::stream::{Stream, StreamExt as _};
use helper_functions::misc;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use strum::AsRefStr;
use thiserror::Error;
use tokio_stream::wrappers::IntervalStream;
use types::{
    config::Config,
    consts::GENESIS_SLOT,
    primitives::{Epoch, Slot, UnixSeconds},
};

pub trait InstantLike: Sized {
    fn checked_add(self, duration: Duration) -> Option<Self>;
}

pub trait SystemTimeLike: Copy {
    type Error: Error + Send + Sync + 'static;

    const UNIX_EPOCH: Self;

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error>;
}

impl InstantLike for Instant {
    fn checked_add(self, duration: Duration) -> Option<Self> {
        Self::checked_add(&self, duration)
    }
}

impl SystemTimeLike for SystemTime {
    type Error = SystemTimeError;

    const UNIX_EPOCH: Self = Self::UNIX_EPOCH;

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error> {
        Self::duration_since(&self, earlier)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Deserialize, Serialize)]
pub struct Tick {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub slot: Slot,
    pub kind: TickKind,
}

impl Tick {
    #[must_use]
    pub const fn new(slot: Slot, kind: TickKind) -> Self {
        Self { slot, kind }
    }

    #[must_use]
    pub const fn start_of_slot(slot: Slot) -> Self {
        Self::new(slot, TickKind::Propose)
    }

    pub fn at_time(config: &Config, time: UnixSeconds, genesis_time: UnixSeconds) -> Result<Self> {
        let duration_since_unix_epoch = Duration::from_secs(time);
        Self::from_duration(config, duration_since_unix_epoch, genesis_time)
    }

    #[must_use]
    pub const fn epoch(self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, self.slot)
    }

    #[must_use]
    pub const fn is_start_of_slot(self) -> bool {
        matches!(self.kind, TickKind::Propose)
    }

    #[must_use]
    pub const fn is_start_of_epoch(self, config: &Config) -> bool {
        misc::is_epoch_start(config, self.slot) && self.is_start_of_slot()
    }

    /// Unix time at which this tick starts.
    #[must_use]
    pub fn time(self, config: &Config, genesis_time: UnixSeconds) -> UnixSeconds {
        let Self { slot, kind } = self;
        let slot_start = genesis_time + (slot - GENESIS_SLOT) * config.seconds_per_slot.get();
        let duration_after_slot = tick_duration(config).saturating_mul(kind as u32);
        slot_start + duration_after_slot.as_secs()
    }

    fn from_duration(
        config: &Config,
        duration_since_unix_epoch: Duration,
        genesis_time: UnixSeconds,
    ) -> Result<Self> {
        let unix_epoch_to_genesis = Duration::from_secs(genesis_time);

        // `Duration` does not implement `Div<Duration>` or `Rem<Duration>`,
        // so we have to do arithmetic on nanoseconds.
        let nanos_since_genesis = duration_since_unix_epoch
            .saturating_sub(unix_epoch_to_genesis)
            .as_nanos();

        let nanos_per_slot = slot_duration(config).as_nanos();
        let slots_since_genesis = u64::try_from(nanos_since_genesis / nanos_per_slot)?;
        let nanos_since_slot_start = nanos_since_genesis % nanos_per_slot;
        let nanos_per_tick = tick_duration(config).as_nanos();
        let ticks_since_slot = usize::try_from(nanos_since_slot_start / nanos_per_tick)?;

        let kind = enum_iterator::all::<TickKind>()
            .nth(ticks_since_slot)
            .ok_or(ClockError::TickOutOfRange)?;

        Ok(Self::new(GENESIS_SLOT + slots_since_genesis, kind))
    }

    fn next(self) -> Result<Self> {
        let Self { slot, kind } = self;

        let next = match kind.next() {
            Some(next_kind) => Self::new(slot, next_kind),
            None => Self::start_of_slot(slot.checked_add(1).ok_or(ClockError::RanOutOfSlots)?),
        };

        Ok(next)
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Sequence, AsRefStr, Deserialize, Serialize,
)]
pub enum TickKind {
    Propose,
    Attest,
    Aggregate,
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ClockError {
    #[error("time of next tick overflowed")]
    NextInstantOverflow,
    #[error("ran out of slots")]
    RanOutOfSlots,
    #[error("slot is too short for its ticks")]
    TickOutOfRange,
}

pub fn ticks(
    config: &Config,
    genesis_time: UnixSeconds,
) -> Result<impl Stream<Item = Result<Tick>> + use<>> {
    // We assume the `Instant` and `SystemTime` obtained here correspond to the same point in time.
    // This is slightly inaccurate but the error will probably be negligible compared to clock
    // differences between different nodes in the network.
    let now_instant = Instant::now();
    let now_system_time = SystemTime::now();

    let (mut next_tick, next_instant) =
        next_tick_with_instant(config, now_instant, now_system_time, genesis_time)?;

    let interval = tokio::time::interval_at(next_instant.into(), tick_duration(config));

    Ok(IntervalStream::new(interval).map(move |_| {
        let current_tick = next_tick;
        next_tick = current_tick.next()?;
        Ok(current_tick)
    }))
}

fn next_tick_with_instant<I: InstantLike, S: SystemTimeLike>(
    config: &Config,
    now_instant: I,
    now_system_time: S,
    genesis_time: UnixSeconds,
) -> Result<(Tick, I)> {
    let unix_epoch_to_now = now_system_time.duration_since(S::UNIX_EPOCH)?;
    let unix_epoch_to_genesis = Duration::from_secs(genesis_time);

    // Some platforms do not support negative `Instant`s. The `InstantLike` trait prevents us from
    // subtracting `Duration`s from `Instant`s.

    let next_tick;
    let now_to_next_tick;

    if unix_epoch_to_now <= unix_epoch_to_genesis {
        next_tick = Tick::start_of_slot(GENESIS_SLOT);
        now_to_next_tick = unix_epoch_to_genesis - unix_epoch_to_now;
    } else {
        let genesis_to_now = unix_epoch_to_now - unix_epoch_to_genesis;
        let tick_duration = tick_duration(config);
        let ticks_per_slot = TickKind::CARDINALITY as u128;

        // The number of the next tick counting from genesis.
        let tick_number = genesis_to_now.as_nanos().div_ceil(tick_duration.as_nanos());
        let slot = u64::try_from(tick_number / ticks_per_slot)?;
        let index = usize::try_from(tick_number % ticks_per_slot)?;

        let kind = enum_iterator::all::<TickKind>()
            .nth(index)
            .ok_or(ClockError::TickOutOfRange)?;

        next_tick = Tick::new(GENESIS_SLOT + slot, kind);

        let genesis_to_next_tick =
            Duration::from_nanos(u64::try_from(tick_number * tick_duration.as_nanos())?);
        now_to_next_tick = genesis_to_next_tick - genesis_to_now;
    }

    let next_instant = now_instant
        .checked_add(now_to_next_tick)
        .ok_or(ClockError::NextInstantOverflow)?;

    Ok((next_tick, next_instant))
}

fn tick_duration(config: &Config) -> Duration {
    slot_duration(config) / TickKind::CARDINALITY as u32
}

const fn slot_duration(config: &Config) -> Duration {
    Duration::from_secs(config.seconds_per_slot.get())
}
