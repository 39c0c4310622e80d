//! Connection health as observed by the connection monitor.

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;

/// Tri-state connection health, plus the state before the first probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Health {
    /// No probe has completed yet.
    #[default]
    Unknown,
    /// The last probe succeeded.
    Online,
    /// The network is present but the backend failed or reported an error.
    Degraded,
    /// The local network is absent.
    Offline,
}

impl Health {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Health::Unknown => "…",
            Health::Online => "ONLINE",
            Health::Degraded => "DEGRADED",
            Health::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Health::Unknown => "unknown",
            Health::Online => "online",
            Health::Degraded => "degraded",
            Health::Offline => "offline",
        })
    }
}

/// The shared health signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthState {
    pub health: Health,

    /// Error detail retained from the last failed probe.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_error: Option<String>,

    /// Unix timestamp in milliseconds of the last transition.
    pub checked_at_ms: u64,

    /// Round trip of the last successful probe.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub latency_ms: Option<u64>,
}

impl HealthState {
    pub fn online(checked_at_ms: u64, latency_ms: u64) -> Self {
        Self {
            health: Health::Online,
            last_error: None,
            checked_at_ms,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn degraded(checked_at_ms: u64, error: impl Into<String>) -> Self {
        Self {
            health: Health::Degraded,
            last_error: Some(error.into()),
            checked_at_ms,
            latency_ms: None,
        }
    }

    pub fn offline(checked_at_ms: u64) -> Self {
        Self {
            health: Health::Offline,
            last_error: None,
            checked_at_ms,
            latency_ms: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.health == Health::Online
    }

    pub fn is_offline(&self) -> bool {
        self.health == Health::Offline
    }

    /// The notice a view should show for this state, if any.
    ///
    /// Nothing is shown while online (or before the first probe). Offline
    /// and degraded states get distinct copy and are always retryable.
    pub fn notice(&self) -> Option<HealthNotice> {
        match self.health {
            Health::Unknown | Health::Online => None,
            Health::Offline => Some(HealthNotice {
                kind: NoticeKind::NoNetwork,
                headline: "You're offline".to_string(),
                detail: "Changes can't be saved until your connection returns.".to_string(),
                retryable: true,
            }),
            Health::Degraded => Some(HealthNotice {
                kind: NoticeKind::BackendError,
                headline: "Can't reach the journal server".to_string(),
                detail: match &self.last_error {
                    Some(err) => format!("The server reported: {}", err),
                    None => "The server didn't respond.".to_string(),
                },
                retryable: true,
            }),
        }
    }
}

/// Which kind of problem a notice describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NoticeKind {
    NoNetwork,
    BackendError,
}

/// User-facing copy for a non-online health state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthNotice {
    pub kind: NoticeKind,
    pub headline: String,
    pub detail: String,
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_and_unknown_show_nothing() {
        assert!(HealthState::default().notice().is_none());
        assert!(HealthState::online(1, 20).notice().is_none());
    }

    #[test]
    fn offline_and_degraded_have_distinct_copy() {
        let offline = HealthState::offline(1).notice().unwrap();
        let degraded = HealthState::degraded(1, "503 Service Unavailable")
            .notice()
            .unwrap();

        assert_eq!(offline.kind, NoticeKind::NoNetwork);
        assert_eq!(degraded.kind, NoticeKind::BackendError);
        assert_ne!(offline.headline, degraded.headline);
        assert!(degraded.detail.contains("503 Service Unavailable"));
        assert!(offline.retryable && degraded.retryable);
    }

    #[test]
    fn degraded_keeps_error_detail() {
        let state = HealthState::degraded(42, "x");
        assert_eq!(state.health, Health::Degraded);
        assert_eq!(state.last_error.as_deref(), Some("x"));
        assert_eq!(state.checked_at_ms, 42);
    }
}
