//! Error types specific to APDU transports

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection error
    #[error("failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("failed to transmit data")]
    Transmission,

    /// Device error
    #[error("device error")]
    Device,

    /// Operation timed out
    #[error("operation timed out")]
    Timeout,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}
