use core::num::NonZeroU64;
use std::borrow::Cow;

use anyhow::Result;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use strum::AsRefStr;

use crate::{
    consts::GWEI_PER_ETH,
    primitives::{Epoch, Gwei, Slot},
};

/// Configuration variables customizable at runtime.
///
/// Field names follow the YAML configurations in `consensus-specs`, so a `Config` can be loaded
/// from a file in that format with [`Config::from_yaml`]. Numbers may be written either as YAML
/// integers or as quoted strings. Missing fields fall back to [`Config::mainnet`].
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,

    // Time parameters
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub seconds_per_slot: NonZeroU64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub slots_per_epoch: NonZeroU64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub intervals_per_slot: NonZeroU64,

    // Validator registry
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_effective_balance: Gwei,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ejection_balance: Gwei,

    // Fork choice
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub proposer_score_boost: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub reorg_head_weight_threshold: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub reorg_parent_weight_threshold: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub reorg_max_epochs_since_finalization: Epoch,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub safe_slots_to_update_justified: Slot,
    pub justification_rule: JustificationRule,

    // Confirmation rule
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub confirmation_byzantine_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),

            seconds_per_slot: nonzero!(12_u64),
            slots_per_epoch: nonzero!(32_u64),
            intervals_per_slot: nonzero!(3_u64),

            max_effective_balance: 32 * GWEI_PER_ETH,
            ejection_balance: 16 * GWEI_PER_ETH,

            proposer_score_boost: 40,
            reorg_head_weight_threshold: 20,
            reorg_parent_weight_threshold: 160,
            reorg_max_epochs_since_finalization: 2,
            safe_slots_to_update_justified: 8,
            justification_rule: JustificationRule::PullUpTip,

            confirmation_byzantine_threshold: 25,
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            seconds_per_slot: nonzero!(6_u64),
            slots_per_epoch: nonzero!(8_u64),
            safe_slots_to_update_justified: 2,
            ..Self::mainnet()
        }
    }

    #[must_use]
    pub fn with_justification_rule(self, justification_rule: JustificationRule) -> Self {
        Self {
            justification_rule,
            ..self
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Length of the first interval of a slot.
    /// Blocks received within it are timely and eligible for proposer boost.
    #[must_use]
    pub const fn seconds_per_interval(&self) -> u64 {
        self.seconds_per_slot.get() / self.intervals_per_slot.get()
    }
}

/// The rule used to promote justified checkpoints.
///
/// Networks changed this rule during their lifetime, so it has to be selectable at runtime.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, AsRefStr)]
pub enum JustificationRule {
    /// Checkpoints justified by the state of a block without waiting for an epoch transition
    /// ("unrealized" checkpoints) are applied at the next epoch boundary, or immediately if the
    /// block is from a past epoch. Introduced in `consensus-specs` v1.3.0.
    #[default]
    PullUpTip,
    /// The rule from `consensus-specs` v1.0. New justified checkpoints are applied immediately
    /// during the first `SAFE_SLOTS_TO_UPDATE_JUSTIFIED` slots of an epoch and queued otherwise.
    /// Queued checkpoints are promoted at the next epoch boundary.
    SafeSlots,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn minimal_overrides_only_time_parameters() {
        let minimal = Config::minimal();
        let mainnet = Config::mainnet();

        assert_eq!(minimal.slots_per_epoch, nonzero!(8_u64));
        assert_eq!(minimal.seconds_per_slot, nonzero!(6_u64));
        assert_eq!(minimal.proposer_score_boost, mainnet.proposer_score_boost);
        assert_eq!(minimal.justification_rule, mainnet.justification_rule);
    }

    #[test]
    fn from_yaml_accepts_quoted_numbers_and_falls_back_to_mainnet() -> Result<()> {
        let config = Config::from_yaml(
            "
            CONFIG_NAME: custom
            SECONDS_PER_SLOT: '4'
            SLOTS_PER_EPOCH: 16
            JUSTIFICATION_RULE: SafeSlots
            ",
        )?;

        assert_eq!(config.config_name, "custom");
        assert_eq!(config.seconds_per_slot, nonzero!(4_u64));
        assert_eq!(config.slots_per_epoch, nonzero!(16_u64));
        assert_eq!(config.justification_rule, JustificationRule::SafeSlots);
        assert_eq!(config.proposer_score_boost, 40);

        Ok(())
    }

    #[test]
    fn from_yaml_rejects_zero_slots_per_epoch() {
        assert!(Config::from_yaml("SLOTS_PER_EPOCH: 0").is_err());
    }

    #[test_case(Config::mainnet() => 4)]
    #[test_case(Config::minimal() => 2)]
    fn seconds_per_interval(config: Config) -> u64 {
        config.seconds_per_interval()
    }
}
