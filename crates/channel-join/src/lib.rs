//! # Channel Join
//!
//! Coordinates the peers of one organization joining a channel.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A join only counts once every targeted peer has both accepted the join
//! proposal and committed the channel's config block, observed on its own
//! block event stream:
//! - Fetch the genesis block under a fresh transaction id
//! - Register one confirmation listener per peer, then submit
//! - Wait for the submission and every listener, each with its own deadline
//! - Release every event subscription, whatever happened
//!
//! ## Guarantees
//!
//! | Guarantee | Description |
//! |-----------|-------------|
//! | All-or-nothing | One unconfirmed peer fails the whole join |
//! | Register-then-submit | No peer can commit before its listener exists |
//! | No leaked subscriptions | Each opened subscription is released exactly once |
//! | No panics past the boundary | Every failure becomes a `JoinOutcome` |
//!
//! ## Module Structure
//!
//! ```text
//! channel-join/
//! ├── domain/          # Requests, responses, outcomes, error taxonomy
//! ├── algorithms/      # Confirmation listener state machine, outcome decision
//! ├── ports/           # API trait (inbound) + network client traits (outbound)
//! ├── adapters/        # In-memory network
//! ├── application/     # JoinCoordinator, submitter, subscription cleanup
//! ├── config.rs        # ChannelJoinConfig
//! └── telemetry.rs     # tracing-subscriber setup
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

// Re-exports
pub use adapters::{InMemoryNetwork, PeerBehavior};
pub use algorithms::{decide_outcome, ConfirmationListener, ListenerState};
pub use application::{submit_join, JoinCoordinator, SubscriptionSet};
pub use config::{ChannelJoinConfig, ConfigError, OrganizationConfig, PeerConfig};
pub use domain::{
    CleanupReport, ConfirmationEvent, GenesisBlock, JoinError, JoinOutcome, JoinRequest,
    ListenerError, NetworkError, PeerOutcome, PeerRef, PeerResponse, SubmitError, SubmitResponse,
    TransactionId, CONFIG_BLOCK_TRANSACTION_COUNT, DEFAULT_EVENT_WAIT_TIMEOUT_MS, STATUS_ACCEPTED,
};
pub use ports::{
    BlockEventResult, BlockEventSender, BlockEventStream, BlockSubscription, ChannelHandle,
    ChannelJoinApi, EventSubscription, NetworkClient, PeerConnection,
};
pub use telemetry::{init_tracing, TelemetryConfig, TelemetryError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
