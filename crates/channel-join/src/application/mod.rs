//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod cleanup;
pub mod service;
pub mod submitter;

pub use cleanup::SubscriptionSet;
pub use service::JoinCoordinator;
pub use submitter::submit_join;
