//! Error types for the sync layer.

use std::time::Duration;

use hearthlog_gateway::GatewayError;
use thiserror::Error;

/// Why a component load did not produce a usable component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The load itself failed.
    #[error("load failed: {0}")]
    Failed(String),

    /// The load did not settle in time.
    #[error("load timed out after {0:?}")]
    Timeout(Duration),

    /// The component loaded but lacks capabilities the caller needs.
    #[error("component is missing required capabilities: {}", .missing.join(", "))]
    Incompatible { missing: Vec<String> },
}

impl LoadError {
    pub fn failed(msg: impl Into<String>) -> Self {
        LoadError::Failed(msg.into())
    }
}

/// Errors surfaced to view controllers.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No local network; retrying is pointless until it returns.
    #[error("no network connection")]
    NetworkUnavailable,

    /// The backend answered with a failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A component could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A bus listener panicked. Logged by the bus, never returned from publish.
    #[error("listener {id} panicked: {message}")]
    ListenerFault { id: u64, message: String },
}

impl SyncError {
    /// Whether the user can reasonably retry right away.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::NetworkUnavailable => false,
            SyncError::Gateway(err) => !matches!(
                err,
                GatewayError::Auth(_) | GatewayError::Unsupported(_) | GatewayError::NotFound { .. }
            ),
            SyncError::Load(_) => true,
            SyncError::ListenerFault { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_lists_missing_capabilities() {
        let err = LoadError::Incompatible {
            missing: vec!["coastline".into(), "markers".into()],
        };
        assert_eq!(
            err.to_string(),
            "component is missing required capabilities: coastline, markers"
        );
    }

    #[test]
    fn retryability() {
        assert!(!SyncError::NetworkUnavailable.is_retryable());
        assert!(SyncError::from(GatewayError::Timeout).is_retryable());
        assert!(!SyncError::from(GatewayError::Auth("k".into())).is_retryable());
        assert!(SyncError::from(LoadError::Timeout(Duration::from_secs(10))).is_retryable());
    }
}
