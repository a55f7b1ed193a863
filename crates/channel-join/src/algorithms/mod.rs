//! # Algorithms Module
//!
//! Per-peer confirmation state machine and the fan-in decision.

pub mod confirmation;
pub mod outcome;

pub use confirmation::{ConfirmationListener, ListenerState};
pub use outcome::decide_outcome;
