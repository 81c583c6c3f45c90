//! Per-connection session state owned by the event core.

use std::collections::VecDeque;

use tokio::sync::mpsc;

/// A connected producer. No state beyond identity and a counter; framing
/// buffers live in the connection task's codec.
#[derive(Debug)]
pub(crate) struct ProducerSession {
    pub name: String,
    /// Lines ingested from this producer.
    pub ingested: u64,
}

impl ProducerSession {
    pub fn new(name: String) -> Self {
        Self { name, ingested: 0 }
    }
}

/// A connected consumer.
///
/// `pending` holds ids dispatched to this consumer but not yet acknowledged,
/// in dispatch order, bounded by the pipeline window. The head of `pending`
/// is always the record the next `ACK`/`ERR` line refers to.
#[derive(Debug)]
pub(crate) struct ConsumerSession {
    pub name: String,
    /// Payload lines travel through here to the socket writer task. A full
    /// channel backpressures the dispatcher; a closed one means the socket
    /// died and teardown is imminent.
    pub outbound: mpsc::Sender<String>,
    pub pending: VecDeque<u64>,
    /// Records delivered to this consumer, redeliveries included.
    pub delivered: u64,
}

impl ConsumerSession {
    pub fn new(name: String, outbound: mpsc::Sender<String>) -> Self {
        Self {
            name,
            outbound,
            pending: VecDeque::new(),
            delivered: 0,
        }
    }
}
