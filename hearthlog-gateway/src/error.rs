//! Error types for gateways.

use hearthlog_types::{EntityId, EntityKind};
use thiserror::Error;

/// Errors a gateway call can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The row does not exist.
    #[error("No {kind} row with id {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// The backend refused the write (constraint, policy, validation).
    #[error("Rejected by backend: {0}")]
    Rejected(String),

    /// Operation not supported by this backend.
    #[error("Feature not supported: {0}")]
    Unsupported(String),
}

impl GatewayError {
    /// Whether the failure says something about reachability rather than
    /// about the request itself.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GatewayError::Connection(_) | GatewayError::Timeout)
    }
}

#[cfg(feature = "rest")]
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_connect() {
            GatewayError::Connection(err.to_string())
        } else if err.is_decode() {
            GatewayError::Parse(err.to_string())
        } else {
            GatewayError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_class() {
        assert!(GatewayError::Timeout.is_connectivity());
        assert!(GatewayError::Connection("refused".into()).is_connectivity());
        assert!(!GatewayError::Auth("bad key".into()).is_connectivity());
        assert!(!GatewayError::Rejected("constraint".into()).is_connectivity());
    }

    #[test]
    fn not_found_message_names_table() {
        let err = GatewayError::NotFound {
            kind: EntityKind::Photo,
            id: EntityId::new("9"),
        };
        assert_eq!(err.to_string(), "No photos row with id 9");
    }
}
