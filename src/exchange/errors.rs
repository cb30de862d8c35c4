//! Exchange boundary error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("not connected")]
    NotConnected,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;
