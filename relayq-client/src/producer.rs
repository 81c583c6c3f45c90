//! Producer client: push newline-delimited records to the broker.

use crate::error::ClientError;
use futures::SinkExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedWrite, LinesCodec};
use tracing::info;

/// Pushes payload lines to the broker's producer port.
///
/// The protocol is a pure push: the broker never answers, so `send`
/// resolving only means the payload reached the socket. Loss detection is
/// TCP's job.
#[derive(Debug)]
pub struct Producer {
    sink: FramedWrite<TcpStream, LinesCodec>,
    sent: u64,
}

impl Producer {
    /// Connect to the broker's producer endpoint.
    pub async fn connect<A: ToSocketAddrs + std::fmt::Display>(
        addr: A,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            ClientError::connection(format!("failed to connect to producer port {addr}: {e}"))
        })?;
        info!("producer connected to {addr}");
        Ok(Self {
            sink: FramedWrite::new(stream, LinesCodec::new()),
            sent: 0,
        })
    }

    /// Send one payload as a record. The payload must not contain `\n`;
    /// the codec supplies the terminator.
    pub async fn send(&mut self, payload: &str) -> Result<(), ClientError> {
        if payload.contains('\n') {
            return Err(ClientError::producer(
                "payload must not contain a newline".to_string(),
            ));
        }
        self.sink.send(payload.to_string()).await?;
        self.sent += 1;
        Ok(())
    }

    /// Send several payloads back to back.
    pub async fn send_batch<I, S>(&mut self, payloads: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for payload in payloads {
            self.send(payload.as_ref()).await?;
        }
        Ok(())
    }

    /// Payloads sent on this connection.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Flush and close the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        SinkExt::<String>::close(&mut self.sink).await?;
        info!("producer closed after {} records", self.sent);
        Ok(())
    }
}
