use core::any::Any;

use anyhow::{anyhow, Error as AnyhowError};

/// Converts the payload of a caught panic into an error.
///
/// Panics raised with [`panic!`] carry either a `&'static str` or a `String`. Any other payload
/// is reported without a message.
pub fn payload_into_error(payload: Box<dyn Any + Send>) -> AnyhowError {
    match payload.downcast::<String>() {
        Ok(message) => anyhow!(message),
        Err(payload) => match payload.downcast::<&str>() {
            Ok(message) => anyhow!(*message),
            Err(_) => anyhow!("panic payload is neither a String nor a &str"),
        },
    }
}
