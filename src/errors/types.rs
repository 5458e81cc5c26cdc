//! Error type definitions for the status hub

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Failure modes of a single upstream status fetch.
///
/// Every variant selects the fallback tier; none is surfaced to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, DNS failure, non-2xx status or an unusable address
    #[error("Upstream unreachable: {url} - {message}")]
    Unreachable { url: String, message: String },

    /// The required documents did not arrive before the deadline
    #[error("Upstream timed out after {timeout:?}: {address}")]
    Timeout { address: String, timeout: Duration },

    /// A required document was not the JSON shape we expect
    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Errors raised by the broadcast hub
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The subscriber's connection is gone
    #[error("Subscriber {id} disconnected")]
    Disconnected { id: Uuid },

    /// The subscriber is not draining its outbound queue
    #[error("Subscriber {id} outbound queue is full")]
    QueueFull { id: Uuid },

    /// The handle does not name a registered subscriber
    #[error("Unknown subscriber {id}")]
    UnknownSubscriber { id: Uuid },

    /// The hub has been shut down
    #[error("Broadcast hub is shut down")]
    ShutDown,

    /// The outbound message could not be encoded
    #[error("Failed to encode message: {message}")]
    Encoding { message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl FetchError {
    pub fn unreachable<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Unreachable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn malformed<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Timeout { .. } => "timeout",
            Self::MalformedResponse { .. } => "malformed",
        }
    }
}
