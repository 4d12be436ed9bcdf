//! Supporting code for the fork choice store.
//!
//! This crate handles the following concerns:
//! - Serializing access to [`Store`] through a dedicated mutator thread.
//! - Delaying and retrying messages that cannot be processed immediately ([`scheduler`]).
//! - [Waiting for message handling to complete](`Controller::wait_for_tasks`).
//! - Notifying other components about changes to the fork choice store ([`Event`]).
//! - Replaying messages in perturbed orders ([`replay`]).
//! - Testing.
//!
//! [`Store`]: fork_choice_store::Store

pub use crate::{
    controller::{Controller, MutatorHandle},
    events::{
        CheckpointEvent, ConfirmationEvent, Event, HeadEvent, RejectionEvent, ReorganizationEvent,
    },
    specialized::AdHocBenchController,
    unbounded_sink::UnboundedSink,
    wait::Wait,
};

pub mod replay;
pub mod scheduler;

mod controller;
mod events;
mod messages;
mod misc;
mod mutator;
mod queries;
mod specialized;
mod unbounded_sink;
mod wait;

#[cfg(test)]
mod extra_tests;
#[cfg(test)]
mod helpers;
