//! Consumer client: receive records and answer each with ACK or ERR.

use crate::error::ClientError;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::info;

/// Receives records from the broker's consumer port.
///
/// The broker expects exactly one [`ack`](Consumer::ack) or
/// [`err`](Consumer::err) per received record, in receive order; dropping
/// the consumer with verdicts outstanding makes the broker requeue those
/// records for someone else.
#[derive(Debug)]
pub struct Consumer {
    framed: Framed<TcpStream, LinesCodec>,
    received: u64,
}

impl Consumer {
    /// Connect to the broker's consumer endpoint.
    pub async fn connect<A: ToSocketAddrs + std::fmt::Display>(
        addr: A,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            ClientError::connection(format!("failed to connect to consumer port {addr}: {e}"))
        })?;
        info!("consumer connected to {addr}");
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new()),
            received: 0,
        })
    }

    /// Wait for the next record. `None` means the broker closed the
    /// connection.
    pub async fn next(&mut self) -> Result<Option<String>, ClientError> {
        match self.framed.next().await {
            Some(Ok(line)) => {
                self.received += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Acknowledge the oldest unanswered record.
    pub async fn ack(&mut self) -> Result<(), ClientError> {
        self.framed.send("ACK".to_string()).await?;
        Ok(())
    }

    /// Reject the oldest unanswered record. The broker treats this the
    /// same as an ACK: the record is consumed, not redelivered.
    pub async fn err(&mut self) -> Result<(), ClientError> {
        self.framed.send("ERR".to_string()).await?;
        Ok(())
    }

    /// Records received on this connection.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Close the connection. Unanswered records go back to the broker's
    /// ready queue.
    pub async fn close(mut self) -> Result<(), ClientError> {
        SinkExt::<String>::close(&mut self.framed).await?;
        info!("consumer closed after {} records", self.received);
        Ok(())
    }
}
