//! Error types for the RelayQ client library

/// Main error type for RelayQ client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection-related errors
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Wire protocol violations
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Producer-specific errors
    #[error("Producer error: {message}")]
    Producer { message: String },

    /// Consumer-specific errors
    #[error("Consumer error: {message}")]
    Consumer { message: String },

    /// Transaction record parsing errors
    #[error("Record error: {message}")]
    Record { message: String },
}

impl ClientError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new producer error
    pub fn producer<S: Into<String>>(message: S) -> Self {
        Self::Producer {
            message: message.into(),
        }
    }

    /// Create a new consumer error
    pub fn consumer<S: Into<String>>(message: S) -> Self {
        Self::Consumer {
            message: message.into(),
        }
    }

    /// Create a new record error
    pub fn record<S: Into<String>>(message: S) -> Self {
        Self::Record {
            message: message.into(),
        }
    }

    /// Check if this error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Io(_))
    }
}

impl From<tokio_util::codec::LinesCodecError> for ClientError {
    fn from(e: tokio_util::codec::LinesCodecError) -> Self {
        match e {
            tokio_util::codec::LinesCodecError::Io(io) => Self::Io(io),
            other => Self::protocol(other.to_string()),
        }
    }
}
