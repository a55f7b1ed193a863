//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for channel join coordination.

mod in_memory;

pub use in_memory::{InMemoryNetwork, PeerBehavior};
