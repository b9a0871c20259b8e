//! Types shared between the arena server and its browser client.
//!
//! Wire types derive `ts_rs::TS`; running the test suite regenerates the
//! TypeScript bindings the client imports.

pub mod config;
pub mod protocol;
