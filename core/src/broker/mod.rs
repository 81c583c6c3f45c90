//! TCP front end: three listeners, per-connection tasks, event plumbing.
//!
//! Producer and consumer sockets are line-framed with
//! [`tokio_util::codec::LinesCodec`]; partial lines persist inside the codec
//! between reads. Connection tasks never touch broker state directly — they
//! forward [`Event`]s to the core and, for consumers, copy payload lines
//! from a bounded channel onto the socket.

pub(crate) mod core;
pub(crate) mod session;

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broker::core::{Event, EventCore};
use crate::config::BrokerConfig;
use crate::journal::{self, Journal, Recovery};
use crate::monitor;
use crate::{BrokerError, Result};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// Capacity of the event channel feeding the core.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The broker: journal recovery plus three bound listeners.
///
/// `bind` fails fast when any listener cannot be bound — the caller turns
/// that into a non-zero exit. `run` consumes the server and only returns on
/// shutdown.
pub struct BrokerServer {
    config: BrokerConfig,
    journal: Journal,
    recovery: Recovery,
    producer_listener: TcpListener,
    consumer_listener: TcpListener,
    monitor_listener: TcpListener,
}

impl BrokerServer {
    /// Replay the journal and bind the producer, consumer and monitor
    /// listeners. Any bind failure is fatal.
    pub async fn bind(config: BrokerConfig) -> Result<Self> {
        config.validate().map_err(BrokerError::Config)?;

        let recovery = journal::recover(&config.journal_path)?;
        info!(
            live = recovery.records.len(),
            next_id = recovery.next_id,
            "journal replayed"
        );
        let journal = Journal::open(&config.journal_path)?;

        let producer_listener =
            TcpListener::bind((config.host.as_str(), config.producer_port)).await?;
        let consumer_listener =
            TcpListener::bind((config.host.as_str(), config.consumer_port)).await?;
        let monitor_listener =
            TcpListener::bind((config.host.as_str(), config.monitor_port)).await?;

        info!(
            producer = %producer_listener.local_addr()?,
            consumer = %consumer_listener.local_addr()?,
            monitor = %monitor_listener.local_addr()?,
            "listeners bound"
        );

        Ok(Self {
            config,
            journal,
            recovery,
            producer_listener,
            consumer_listener,
            monitor_listener,
        })
    }

    /// Bound addresses, in producer/consumer/monitor order. Mostly useful
    /// when binding port 0.
    pub fn local_addrs(&self) -> Result<(SocketAddr, SocketAddr, SocketAddr)> {
        Ok((
            self.producer_listener.local_addr()?,
            self.consumer_listener.local_addr()?,
            self.monitor_listener.local_addr()?,
        ))
    }

    /// Run the broker: spawns the three accept loops and drives the event
    /// core on this task, so cancelling `run` cancels the whole broker.
    pub async fn run(self) -> Result<()> {
        let (events, inbox) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let dispatch_buffer = self.config.dispatch_buffer;
        let core = EventCore::new(self.config, self.journal, self.recovery);

        let producer_accept = tokio::spawn(accept_producers(self.producer_listener, events.clone()));
        let consumer_accept = tokio::spawn(accept_consumers(
            self.consumer_listener,
            events.clone(),
            dispatch_buffer,
        ));
        let monitor_accept = tokio::spawn(monitor::serve(self.monitor_listener, events));

        core.run(inbox).await;

        producer_accept.abort();
        consumer_accept.abort();
        monitor_accept.abort();
        Ok(())
    }
}

async fn accept_producers(listener: TcpListener, events: mpsc::Sender<Event>) {
    let mut seq = 0u64;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                seq += 1;
                let name = format!("p{seq}");
                debug!(%addr, producer = %name, "accepted producer socket");
                if events
                    .send(Event::ProducerJoined {
                        conn: seq,
                        name,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::spawn(producer_reader(seq, stream, events.clone()));
            }
            Err(e) => warn!("producer accept failed: {e}"),
        }
    }
}

async fn accept_consumers(listener: TcpListener, events: mpsc::Sender<Event>, buffer: usize) {
    let mut seq = 0u64;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                seq += 1;
                let name = format!("c{seq}");
                debug!(%addr, consumer = %name, "accepted consumer socket");
                let (read_half, write_half) = stream.into_split();
                let (outbound, outbox) = mpsc::channel(buffer);
                if events
                    .send(Event::ConsumerJoined {
                        conn: seq,
                        name,
                        outbound,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::spawn(consumer_writer(write_half, outbox));
                tokio::spawn(consumer_reader(seq, read_half, events.clone()));
            }
            Err(e) => warn!("consumer accept failed: {e}"),
        }
    }
}

/// Frame producer bytes into lines and hand each to the core. EOF or a
/// framing error ends the session; a trailing partial line is discarded
/// with the codec.
async fn producer_reader(conn: u64, stream: TcpStream, events: mpsc::Sender<Event>) {
    let mut lines = FramedRead::new(stream, LinesCodec::new());
    while let Some(next) = lines.next().await {
        match next {
            Ok(line) => {
                if events
                    .send(Event::ProducerLine { conn, line })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                debug!("producer read error: {e}");
                break;
            }
        }
    }
    let _ = events.send(Event::ProducerLeft { conn }).await;
}

/// Frame the consumer's verdict stream; EOF or error reaps the session.
async fn consumer_reader(conn: u64, read_half: OwnedReadHalf, events: mpsc::Sender<Event>) {
    let mut lines = FramedRead::new(read_half, LinesCodec::new());
    while let Some(next) = lines.next().await {
        match next {
            Ok(line) => {
                if events
                    .send(Event::ConsumerLine { conn, line })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                debug!("consumer read error: {e}");
                break;
            }
        }
    }
    let _ = events.send(Event::ConsumerLeft { conn }).await;
}

/// Copy dispatched payload lines onto the consumer socket. The codec
/// appends the newline. Exiting drops the receiver, which the dispatcher
/// observes as a closed channel.
async fn consumer_writer(write_half: OwnedWriteHalf, mut outbox: mpsc::Receiver<String>) {
    let mut sink = FramedWrite::new(write_half, LinesCodec::new());
    while let Some(line) = outbox.recv().await {
        if let Err(e) = sink.send(line).await {
            debug!("consumer write error: {e}");
            break;
        }
    }
}
