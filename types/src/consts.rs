use core::num::NonZeroU64;

use nonzero_ext::nonzero;

use crate::primitives::{Epoch, Gwei, Slot};

pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;
pub const GWEI_PER_ETH: Gwei = 1_000_000_000;

/// Number of bits in `BeaconState.justification_bits`.
pub const JUSTIFICATION_BITS_LENGTH: u32 = 4;

pub const MIN_ATTESTATION_INCLUSION_DELAY: NonZeroU64 = nonzero!(1_u64);
