//! Arena server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod bot;
pub mod collectible;
pub mod collision;
pub mod config;
pub mod game_loop;
pub mod player;
pub mod protocol;
pub mod session;
pub mod state;
pub mod store;
pub mod ws;
