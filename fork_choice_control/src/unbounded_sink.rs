use futures::{
    channel::mpsc::{TrySendError, UnboundedSender},
    sink::Drain,
};

/// Destination for [`Event`]s that never applies backpressure to the mutator thread.
///
/// [`Event`]: crate::Event
pub trait UnboundedSink<T>: Send + 'static {
    /// Returns the message back if the receiving end is gone.
    fn unbounded_send(&self, message: T) -> Result<(), T>;
}

impl<T: Send + 'static> UnboundedSink<T> for UnboundedSender<T> {
    fn unbounded_send(&self, message: T) -> Result<(), T> {
        Self::unbounded_send(self, message).map_err(TrySendError::into_inner)
    }
}

// Used by tools that have no consumer for events.
impl<T: Send + 'static> UnboundedSink<T> for Drain<T> {
    fn unbounded_send(&self, _message: T) -> Result<(), T> {
        Ok(())
    }
}
