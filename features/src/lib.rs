//! Process-wide switches that change how fork choice treats messages or what it logs.
//!
//! Features are disabled by default and can only be enabled. They are meant to be set once at
//! startup, before any messages are processed.

#![allow(
    unused_crate_dependencies,
    reason = "The `unused_crate_dependencies` lint checks every crate in a package separately. \
              See <https://github.com/rust-lang/rust/issues/57274>."
)]

use core::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};

use log::{info, warn};
use parse_display::{Display, FromStr};
use variant_count::VariantCount;

static FEATURES: [AtomicBool; Feature::VARIANT_COUNT] =
    [const { AtomicBool::new(false) }; Feature::VARIANT_COUNT];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, FromStr, VariantCount)]
pub enum Feature {
    // Log every head change along with the weights of the old and new heads.
    DebugForkChoice,
    // Drop attestations that would otherwise be delayed until their blocks arrive.
    IgnoreAttestationsForUnknownBlocks,
    // Drop attestations that would otherwise be delayed until their slot.
    IgnoreFutureAttestations,
    LogBlockProcessingTime,
}

impl Feature {
    // `Ordering::SeqCst` is slightly slower, but using other orderings could result in strange
    // behaviors when features are toggled while messages are being processed.
    const ORDERING: Ordering = Ordering::SeqCst;

    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        FEATURES[self as usize].load(Self::ORDERING)
    }

    #[inline]
    pub fn enable(self) {
        FEATURES[self as usize].store(true, Self::ORDERING)
    }

    pub fn log(self, message: impl Display) {
        info!("[{self}] {message}");
    }

    pub fn warn(self, message: impl Display) {
        warn!("[{self}] {message}");
    }
}

/// Logs a message tagged with a [`Feature`] if it is enabled.
///
/// The message arguments are only evaluated if the feature is enabled.
#[macro_export]
macro_rules! log {
    ($feature: ident, $($message: tt)+) => {{
        let feature = $crate::Feature::$feature;
        if feature.is_enabled() {
            feature.log(format_args!($($message)+))
        }
    }};
}
