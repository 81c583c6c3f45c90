//! # RelayQ Core Library
//!
//! RelayQ is a single-node, fault-tolerant message broker for line-delimited
//! records. Producers push newline-terminated payloads; the broker assigns
//! each record a monotonic id, appends it to a durable journal, and hands it
//! to exactly one of the connected consumers at a time. Consumers answer
//! every record with `ACK` or `ERR`; records still outstanding when a
//! consumer drops are requeued for the others. On restart the broker replays
//! the journal so that nothing acknowledged is redelivered and nothing
//! unacknowledged is lost.
//!
//! ## Architecture Overview
//!
//! - [`journal`] - append-only log store and crash recovery
//! - [`registry`] - in-memory record registry and ready queue
//! - [`broker`] - TCP listeners, connection tasks, and the event core
//! - [`monitor`] - one-shot HTTP status endpoint
//! - [`stats`] - broker counters and the status snapshot
//!
//! All broker state lives on a single event-core task; connection tasks only
//! frame lines and forward events, so the delivery guarantees (at-least-once,
//! per-consumer ordering, bounded in-flight window) hold without locks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relayq::{BrokerConfig, BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> relayq::Result<()> {
//!     let config = BrokerConfig::default();
//!     let server = BrokerServer::bind(config).await?;
//!     server.run().await
//! }
//! ```

pub mod broker;
pub mod config;
pub mod journal;
pub mod monitor;
pub mod registry;
pub mod stats;

pub use broker::BrokerServer;
pub use config::BrokerConfig;
pub use journal::{Journal, Recovery};
pub use registry::{MessageRegistry, ReadyQueue, Record};
pub use stats::{BrokerStats, StatusSnapshot};

use thiserror::Error;

/// RelayQ error types
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Journal and socket I/O failures
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Line framing violations on a connection
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// Monitor document serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for RelayQ operations
pub type Result<T> = std::result::Result<T, BrokerError>;
