use helper_functions::error::{Error as HelperError, SignatureKind};
use thiserror::Error;
use types::{
    containers::{AttestationData, Checkpoint},
    primitives::{Epoch, Slot, ValidatorIndex, H256},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "anchor state does not match anchor block \
         (computed: {computed:?}, in_block: {in_block:?})"
    )]
    AnchorStateMismatch { computed: H256, in_block: H256 },
    #[error(
        "attestation votes for a block from the future \
         (data: {data:?}, block_slot: {block_slot})"
    )]
    AttestationForFutureBlock {
        data: AttestationData,
        block_slot: Slot,
    },
    #[error(
        "attestation targets an epoch before the previous one \
         (target_epoch: {target_epoch}, previous_epoch: {previous_epoch})"
    )]
    AttestationTooOld {
        target_epoch: Epoch,
        previous_epoch: Epoch,
    },
    #[error("attestation votes for a checkpoint in the wrong epoch: {data:?}")]
    AttestationTargetsWrongEpoch { data: AttestationData },
    #[error(
        "message is at or behind finalization \
         (slot: {slot}, finalized_slot: {finalized_slot})"
    )]
    AlreadyFinalized { slot: Slot, finalized_slot: Slot },
    #[error(
        "block does not descend from the finalized block \
         (block_root: {block_root:?}, finalized_root: {finalized_root:?})"
    )]
    ConflictsWithFinalized { block_root: H256, finalized_root: H256 },
    #[error(
        "attestation target is not the ancestor of its head vote at the start of the target epoch \
         (data: {data:?}, ancestor: {ancestor:?})"
    )]
    FfgAndLmdInconsistent {
        data: AttestationData,
        ancestor: Option<H256>,
    },
    #[error("message is from a future slot (slot: {slot}, current_slot: {current_slot})")]
    FutureSlot { slot: Slot, current_slot: Slot },
    #[error("attesting indices are empty, unsorted or duplicated")]
    InvalidIndices,
    #[error("validator {index} is not in the registry")]
    InvalidValidatorIndex { index: ValidatorIndex },
    #[error("attester slashing has no indices in common between its attestations")]
    NoSlashableIndices,
    #[error(
        "block is not later than its parent \
         (block_root: {block_root:?}, slot: {slot}, parent_slot: {parent_slot})"
    )]
    NotLaterThanParent {
        block_root: H256,
        slot: Slot,
        parent_slot: Slot,
    },
    #[error(
        "attestations in attester slashing are not slashable \
         (data_1: {data_1:?}, data_2: {data_2:?})"
    )]
    NotSlashable {
        data_1: AttestationData,
        data_2: AttestationData,
    },
    #[error("{kind} is invalid")]
    SignatureInvalid { kind: SignatureKind },
    #[error("slot {slot} is too far in the future to ever be processed")]
    SlotOutOfRange { slot: Slot },
    #[error("state transition failed for block {block_root:?}")]
    StateTransition {
        block_root: H256,
        #[source]
        source: anyhow::Error,
    },
    #[error("attestation votes for an unknown block: {beacon_block_root:?}")]
    UnknownBeaconBlockRoot { beacon_block_root: H256 },
    #[error("parent of block {block_root:?} is unknown: {parent_root:?}")]
    UnknownParent { block_root: H256, parent_root: H256 },
    #[error("attestation targets an unknown checkpoint: {target:?}")]
    UnknownTarget { target: Checkpoint },
}

/// How a rejected message should be treated by whoever submitted it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// The message may become acceptable once a block arrives or time advances.
    Early,
    /// The message is useless but not malicious. It should be dropped without penalty.
    Ignored,
    /// The message violates consensus rules. It must never be retried.
    Invalid,
}

impl ErrorKind {
    /// Classifies an error returned by one of the `Store::on_*` methods.
    ///
    /// Errors that did not originate in the store are treated as invalid.
    #[must_use]
    pub fn of(error: &anyhow::Error) -> Self {
        error
            .downcast_ref::<Error>()
            .map_or(Self::Invalid, Error::kind)
    }
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownParent { .. }
            | Self::UnknownTarget { .. }
            | Self::UnknownBeaconBlockRoot { .. }
            | Self::FutureSlot { .. } => ErrorKind::Early,
            Self::AlreadyFinalized { .. }
            | Self::AttestationTooOld { .. }
            | Self::ConflictsWithFinalized { .. } => ErrorKind::Ignored,
            Self::AnchorStateMismatch { .. }
            | Self::AttestationForFutureBlock { .. }
            | Self::AttestationTargetsWrongEpoch { .. }
            | Self::FfgAndLmdInconsistent { .. }
            | Self::InvalidIndices
            | Self::InvalidValidatorIndex { .. }
            | Self::NoSlashableIndices
            | Self::NotLaterThanParent { .. }
            | Self::NotSlashable { .. }
            | Self::SignatureInvalid { .. }
            | Self::SlotOutOfRange { .. }
            | Self::StateTransition { .. } => ErrorKind::Invalid,
        }
    }

    #[must_use]
    pub const fn is_early(&self) -> bool {
        matches!(self.kind(), ErrorKind::Early)
    }

    pub(crate) fn block_transition(block_root: H256, source: anyhow::Error) -> Self {
        match source.downcast_ref::<HelperError>() {
            Some(HelperError::SignatureInvalid(kind)) => Self::SignatureInvalid { kind: *kind },
            _ => Self::StateTransition { block_root, source },
        }
    }

    pub(crate) fn from_helper(source: anyhow::Error) -> anyhow::Error {
        let converted = match source.downcast_ref::<HelperError>() {
            Some(HelperError::SignatureInvalid(kind)) => Self::SignatureInvalid { kind: *kind },
            Some(
                HelperError::AttestationHasNoAttestingIndices
                | HelperError::AttestingIndicesNotSortedAndUnique,
            ) => Self::InvalidIndices,
            Some(HelperError::ValidatorNotFound { index }) => {
                Self::InvalidValidatorIndex { index: *index }
            }
            _ => return source,
        };

        converted.into()
    }
}
