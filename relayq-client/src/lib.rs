//! # RelayQ Client Library
//!
//! Async clients for the two sides of a RelayQ broker: a [`Producer`] that
//! pushes newline-delimited payloads, and a [`Consumer`] that receives
//! records and answers each one with `ACK` or `ERR`. The [`record`] module
//! adds the transaction payload format used by the demo binaries.
//!
//! ## Producer Example
//!
//! ```rust,no_run
//! use relayq_client::Producer;
//!
//! #[tokio::main]
//! async fn main() -> relayq_client::Result<()> {
//!     let mut producer = Producer::connect("localhost:9100").await?;
//!     producer.send("hello").await?;
//!     producer.close().await
//! }
//! ```
//!
//! ## Consumer Example
//!
//! ```rust,no_run
//! use relayq_client::Consumer;
//!
//! #[tokio::main]
//! async fn main() -> relayq_client::Result<()> {
//!     let mut consumer = Consumer::connect("localhost:9200").await?;
//!     while let Some(record) = consumer.next().await? {
//!         println!("got: {record}");
//!         consumer.ack().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod consumer;
pub mod error;
pub mod producer;
pub mod record;

pub use consumer::Consumer;
pub use error::ClientError;
pub use producer::Producer;
pub use record::{luhn_check, Transaction};

/// Client library result type
pub type Result<T> = std::result::Result<T, ClientError>;
