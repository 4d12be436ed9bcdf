//! State transition consumed by fork choice.
//!
//! [`StateTransition`] is the narrow interface fork choice uses. [`Phase0Transition`] implements
//! it with the parts of the Phase 0 state transition that affect fork choice: block headers,
//! attestations, attester slashings and Casper FFG justification and finalization. Rewards,
//! deposits and registry updates are left out.

pub use state_transition::{Phase0Transition, StateRootPolicy, StateTransition};

pub mod phase0 {
    pub use block_processing::{process_attestation, process_attester_slashing};
    pub use epoch_processing::{
        process_justification_and_finalization, weigh_justification_and_finalization,
    };
    pub use slot_processing::{process_slot, process_slots};

    pub(crate) use block_processing::process_block;

    mod block_processing;
    mod epoch_processing;
    mod slot_processing;
}

mod error;
mod state_transition;
