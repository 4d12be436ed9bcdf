use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_utils::sync::WaitGroup;

/// A way of keeping track of messages that the mutator has not finished handling.
///
/// Every message sent to the mutator carries a `Wait` value that is dropped once the message has
/// been handled and the resulting snapshot has been published. `()` makes this a no-op.
/// [`WaitGroup`] lets tests and benchmarks wait for all submitted messages.
pub trait Wait: Clone + Default + Send + 'static {
    type Swappable: Clone + Default + Send + Sync;

    fn load_and_clone(swappable: &Self::Swappable) -> Self;
}

impl Wait for () {
    type Swappable = ();

    fn load_and_clone((): &Self::Swappable) -> Self {}
}

impl Wait for WaitGroup {
    type Swappable = Arc<Mutex<Self>>;

    fn load_and_clone(swappable: &Self::Swappable) -> Self {
        // The mutex only guards a `WaitGroup`, which cannot be left in an inconsistent state.
        swappable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
