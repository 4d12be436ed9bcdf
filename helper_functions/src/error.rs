use parse_display::Display;
use thiserror::Error;
use types::primitives::{Slot, ValidatorIndex};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation has no attesting indices")]
    AttestationHasNoAttestingIndices,
    #[error("attesting indices are not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error("no validators are active")]
    NoActiveValidators,
    #[error("aggregate signature has no public keys")]
    NoPublicKeys,
    #[error("{0} is invalid")]
    SignatureInvalid(SignatureKind),
    #[error("slot {slot} is out of range")]
    SlotOutOfRange { slot: Slot },
    #[error("validator {index} is not in the registry")]
    ValidatorNotFound { index: ValidatorIndex },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum SignatureKind {
    #[display("attestation signature")]
    Attestation,
    #[display("block signature")]
    Block,
}
