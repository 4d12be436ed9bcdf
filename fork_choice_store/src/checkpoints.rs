//! Justified and finalized checkpoints known to the store.
//!
//! How new checkpoints are adopted depends on [`JustificationRule`]:
//! - With [`JustificationRule::PullUpTip`] checkpoints from post-states are applied immediately.
//!   Unrealized checkpoints (those the post-state would have at the end of its epoch) are
//!   collected separately and pulled up at the next epoch boundary.
//! - With [`JustificationRule::SafeSlots`] a new justified checkpoint is applied immediately
//!   only if it cannot be used to revert recent votes. Otherwise it is queued until the next
//!   epoch boundary. The store decides when that is the case.
//!
//! Neither justified nor finalized checkpoints ever move back to an earlier epoch.
//!
//! [`JustificationRule`]: types::config::JustificationRule
//! [`JustificationRule::PullUpTip`]: types::config::JustificationRule::PullUpTip
//! [`JustificationRule::SafeSlots`]: types::config::JustificationRule::SafeSlots

use core::ops::BitOrAssign;

use types::containers::Checkpoint;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CheckpointChanges {
    pub justified_updated: bool,
    pub finalized_updated: bool,
}

impl BitOrAssign for CheckpointChanges {
    fn bitor_assign(&mut self, other: Self) {
        self.justified_updated |= other.justified_updated;
        self.finalized_updated |= other.finalized_updated;
    }
}

impl CheckpointChanges {
    #[must_use]
    pub const fn any(self) -> bool {
        self.justified_updated || self.finalized_updated
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Checkpoints {
    pub justified: Checkpoint,
    pub finalized: Checkpoint,
    pub unrealized_justified: Checkpoint,
    pub unrealized_finalized: Checkpoint,
    // Called `best_justified_checkpoint` in old versions of `consensus-specs`.
    pub queued_justified: Option<Checkpoint>,
}

impl Checkpoints {
    #[must_use]
    pub const fn new(anchor: Checkpoint) -> Self {
        Self {
            justified: anchor,
            finalized: anchor,
            unrealized_justified: anchor,
            unrealized_finalized: anchor,
            queued_justified: None,
        }
    }

    /// Adopts checkpoints that are newer than the current ones.
    pub fn update(&mut self, justified: Checkpoint, finalized: Checkpoint) -> CheckpointChanges {
        let justified_updated = justified.epoch > self.justified.epoch;
        let finalized_updated = finalized.epoch > self.finalized.epoch;

        if justified_updated {
            self.justified = justified;
        }

        if finalized_updated {
            self.finalized = finalized;
        }

        CheckpointChanges {
            justified_updated,
            finalized_updated,
        }
    }

    pub fn update_unrealized(&mut self, justified: Checkpoint, finalized: Checkpoint) {
        if justified.epoch > self.unrealized_justified.epoch {
            self.unrealized_justified = justified;
        }

        if finalized.epoch > self.unrealized_finalized.epoch {
            self.unrealized_finalized = finalized;
        }
    }

    /// Applies the unrealized checkpoints as if the epoch had ended.
    pub fn pull_up_unrealized(&mut self) -> CheckpointChanges {
        self.update(self.unrealized_justified, self.unrealized_finalized)
    }

    /// Applies checkpoints from a post-state under [`JustificationRule::SafeSlots`].
    ///
    /// `justified_conflicts_with_finalized` must be set if the current justified checkpoint does
    /// not descend from `finalized`.
    ///
    /// [`JustificationRule::SafeSlots`]: types::config::JustificationRule::SafeSlots
    pub fn update_with_safe_slots(
        &mut self,
        justified: Checkpoint,
        finalized: Checkpoint,
        should_update_justified: bool,
        justified_conflicts_with_finalized: bool,
    ) -> CheckpointChanges {
        let mut changes = CheckpointChanges::default();

        if justified.epoch > self.justified.epoch {
            if self
                .queued_justified
                .is_none_or(|queued| justified.epoch > queued.epoch)
            {
                self.queued_justified = Some(justified);
            }

            if should_update_justified {
                self.justified = justified;
                changes.justified_updated = true;
            }
        }

        if finalized.epoch > self.finalized.epoch {
            self.finalized = finalized;
            changes.finalized_updated = true;

            let replace_justified = justified.epoch > self.justified.epoch
                || (justified_conflicts_with_finalized && justified.epoch >= self.justified.epoch);

            if replace_justified && justified != self.justified {
                self.justified = justified;
                changes.justified_updated = true;
            }
        }

        changes
    }

    /// Promotes the queued justified checkpoint at an epoch boundary.
    ///
    /// `queued_descends_from_finalized` is evaluated by the store, which knows the block tree.
    /// A queued checkpoint on a branch that conflicts with `finalized` stays queued until a
    /// newer candidate replaces it.
    pub fn promote_queued(
        &mut self,
        queued_descends_from_finalized: impl FnOnce(Checkpoint) -> bool,
    ) -> CheckpointChanges {
        let mut changes = CheckpointChanges::default();

        let Some(queued) = self.queued_justified else {
            return changes;
        };

        if queued.epoch <= self.justified.epoch {
            self.queued_justified = None;
            return changes;
        }

        if queued_descends_from_finalized(queued) {
            self.queued_justified = None;
            self.justified = queued;
            changes.justified_updated = true;
        }

        changes
    }
}
