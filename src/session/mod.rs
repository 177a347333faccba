//! Session: owner of streams and subscribers

pub mod state;

pub use state::Session;
