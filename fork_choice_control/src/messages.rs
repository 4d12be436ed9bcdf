use std::sync::{mpsc::Sender, Arc};

use fork_choice_store::AttesterSlashingOrigin;
use log::debug;
use types::{
    containers::{Attestation, AttesterSlashing, SignedBeaconBlock},
    primitives::UnixSeconds,
};

pub enum MutatorMessage<W> {
    Tick {
        wait_group: W,
        time: UnixSeconds,
    },
    Block {
        wait_group: W,
        block: Arc<SignedBeaconBlock>,
    },
    Attestation {
        wait_group: W,
        attestation: Arc<Attestation>,
    },
    AttesterSlashing {
        wait_group: W,
        attester_slashing: Box<AttesterSlashing>,
        origin: AttesterSlashingOrigin,
    },
    // It doesn't make sense for this to have a `wait_group` field because this is only sent when
    // the corresponding `Controller` is dropped. There is no way to call
    // `Controller::wait_for_tasks` after that.
    Stop,
}

impl<W> MutatorMessage<W> {
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Block { .. } => "block",
            Self::Attestation { .. } => "attestation",
            Self::AttesterSlashing { .. } => "attester_slashing",
            Self::Stop => "stop",
        }
    }

    pub(crate) fn send(self, tx: &Sender<Self>) {
        // Don't log the value because blocks can be large.
        if tx.send(self).is_err() {
            // This can happen if the mutator thread exits early due to failure.
            debug!("send to mutator failed because the receiver was dropped");
        }
    }
}
