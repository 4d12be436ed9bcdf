use serde::{Deserialize, Serialize};

use crate::{
    primitives::{
        CommitteeIndex, Epoch, Gwei, PublicKeyBytes, SignatureBytes, Slot, ValidatorIndex, H256,
    },
    traits::{container_root, SszHash},
};

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

/// An attestation with its attesting validator indices already resolved.
///
/// Committee assignment is the business of the state transition function.
/// Fork choice only needs to know who voted.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Attestation {
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttesterSlashing {
    pub attestation_1: Attestation,
    pub attestation_2: Attestation,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlockBody {
    pub graffiti: H256,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub attestations: Vec<Attestation>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
}

impl BeaconBlock {
    #[must_use]
    pub fn to_header(&self) -> BeaconBlockHeader {
        let Self {
            slot,
            proposer_index,
            parent_root,
            state_root,
            ref body,
        } = *self;

        BeaconBlockHeader {
            slot,
            proposer_index,
            parent_root,
            state_root,
            body_root: body.hash_tree_root(),
        }
    }
}

impl SignedBeaconBlock {
    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.message.slot
    }

    #[must_use]
    pub const fn parent_root(&self) -> H256 {
        self.message.parent_root
    }
}

impl SszHash for Checkpoint {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[self.epoch.hash_tree_root(), self.root])
    }
}

impl SszHash for AttestationData {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.slot.hash_tree_root(),
            self.index.hash_tree_root(),
            self.beacon_block_root,
            self.source.hash_tree_root(),
            self.target.hash_tree_root(),
        ])
    }
}

impl SszHash for Attestation {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.attesting_indices.hash_tree_root(),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for AttesterSlashing {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.attestation_1.hash_tree_root(),
            self.attestation_2.hash_tree_root(),
        ])
    }
}

impl SszHash for BeaconBlockBody {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.graffiti,
            self.attester_slashings.hash_tree_root(),
            self.attestations.hash_tree_root(),
        ])
    }
}

// The root of a block is the root of its header. `transition_functions` relies on this to
// identify blocks using only `BeaconState.latest_block_header`.
impl SszHash for BeaconBlock {
    fn hash_tree_root(&self) -> H256 {
        self.to_header().hash_tree_root()
    }
}

impl SszHash for BeaconBlockHeader {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.slot.hash_tree_root(),
            self.proposer_index.hash_tree_root(),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }
}

impl SszHash for Validator {
    fn hash_tree_root(&self) -> H256 {
        container_root(&[
            self.pubkey.hash_tree_root(),
            self.effective_balance.hash_tree_root(),
            self.slashed.hash_tree_root(),
            self.activation_epoch.hash_tree_root(),
            self.exit_epoch.hash_tree_root(),
        ])
    }
}
