pub mod accessors;
pub mod error;
pub mod misc;
pub mod predicates;
pub mod signing;
pub mod verifier;
