//! Implementation of [Beacon Chain Fork Choice].
//!
//! Unfinalized blocks are kept in a [`BlockTree`] rooted at the latest finalized block. Every node
//! in the tree stores the attesting balance of its subtree. Votes are applied as differences that
//! propagate towards the root, so looking up the weight of a block never requires iterating over
//! votes. [`Store::weight_uncached`] does it the slow way and is only meant for tests.
//!
//! Block and attestation processing is split into pairs of `validate_*` and `apply_*` methods.
//! The `validate_*` methods do not mutate [`Store`] and can be used to process objects in parallel.
//! Because of the split some functions from the Fork Choice specification do not have exact
//! equivalents in the implementation.
//!
//! This implementation makes use of persistent data structures, but they are not required for the
//! algorithm to work. They're only used to make snapshots cheap.
//!
//! Python `assert`s are represented by statements that either delay the processing of the offending
//! object or return [`Err`]. Objects that should be delayed are returned as `Delay*` variants of
//! [`BlockAction`] and [`AttestationAction`] from the `validate_*` methods. The `on_*` methods
//! report them as errors for which [`Error::is_early`] returns `true`.
//!
//! Two ways of updating the justified checkpoint are supported. See [`checkpoints`] for details.
//!
//! Notes on nomenclature:
//! - Pruning means removing blocks that no longer descend from the finalized block.
//! - Equivocating validators are those proven to have cast conflicting votes.
//!   Their votes are ignored for the rest of the run.
//! - Confirmed blocks are those that cannot be reorged out under synchrony assumptions.
//!   See [`confirmation`].
//!
//! [Beacon Chain Fork Choice]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md

pub use crate::{
    block_tree::BlockTree,
    checkpoints::{CheckpointChanges, Checkpoints},
    equivocations::EquivocatingIndices,
    error::{Error, ErrorKind},
    misc::{
        AttestationAction, AttestationOrigin, AttesterSlashingOrigin, BlockAction, ChainLink,
        LatestMessage, ValidAttestation,
    },
    store::Store,
    store_config::StoreConfig,
};

pub mod checkpoints;
pub mod confirmation;
pub mod proposer_head;

mod block_tree;
mod equivocations;
mod error;
mod misc;
mod store;
mod store_config;

#[cfg(test)]
mod tests;
