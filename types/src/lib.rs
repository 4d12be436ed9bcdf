//! Types shared by the fork choice engine, its state transition and the tools built on them.

pub mod beacon_state;
pub mod config;
pub mod consts;
pub mod containers;
pub mod primitives;
pub mod traits;
