use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::domain::error::{ExhaustionReason, LeaseError};

/// Where a watched lease currently is in its renewal lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalState {
    /// Waiting for the next renewal deadline
    Active,
    /// A renewal request is outstanding (including retries)
    Renewing,
    /// The lease was just extended; scheduling resumes from `Active`
    Renewed,
    /// The lease reached the end of its validity window
    Exhausted,
    /// Renewal failed unrecoverably
    Failed,
    /// The caller cancelled the watch
    Stopped,
}

impl RenewalState {
    /// Terminal states schedule no further renewals
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for RenewalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Active => "active",
            Self::Renewing => "renewing",
            Self::Renewed => "renewed",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

/// One outcome reported by the lease watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalEvent {
    pub state: RenewalState,

    /// New validity, set for `Renewed`
    #[serde(rename = "ttl_secs", serialize_with = "serialize_secs")]
    pub ttl: Option<Duration>,

    /// Set for `Exhausted`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExhaustionReason>,

    /// Set for `Failed`
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_error")]
    pub error: Option<LeaseError>,

    pub at: DateTime<Utc>,
}

impl RenewalEvent {
    fn new(state: RenewalState) -> Self {
        Self {
            state,
            ttl: None,
            reason: None,
            error: None,
            at: Utc::now(),
        }
    }

    pub fn renewed(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(RenewalState::Renewed)
        }
    }

    pub fn exhausted(reason: ExhaustionReason) -> Self {
        Self {
            reason: Some(reason),
            ..Self::new(RenewalState::Exhausted)
        }
    }

    pub fn failed(error: LeaseError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(RenewalState::Failed)
        }
    }

    pub fn stopped() -> Self {
        Self::new(RenewalState::Stopped)
    }

    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[allow(clippy::ref_option)]
fn serialize_secs<S: Serializer>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match ttl {
        Some(ttl) => serializer.serialize_some(&ttl.as_secs()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::ref_option)]
fn serialize_error<S: Serializer>(
    error: &Option<LeaseError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RenewalState::Exhausted.is_terminal());
        assert!(RenewalState::Failed.is_terminal());
        assert!(RenewalState::Stopped.is_terminal());
        assert!(!RenewalState::Active.is_terminal());
        assert!(!RenewalState::Renewing.is_terminal());
        assert!(!RenewalState::Renewed.is_terminal());
    }

    #[test]
    fn test_event_json_shape() {
        let event = RenewalEvent::renewed(Duration::from_secs(600));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["state"], "renewed");
        assert_eq!(value["ttl_secs"], 600);
        assert!(value.get("reason").is_none());
        assert!(value.get("error").is_none());

        let event = RenewalEvent::failed(LeaseError::AuthenticationFailed("denied".to_string()));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["state"], "failed");
        assert!(value["ttl_secs"].is_null());
        assert_eq!(value["error"], "Authentication to secrets backend failed: denied");
    }

    #[test]
    fn test_exhausted_carries_reason() {
        let event = RenewalEvent::exhausted(ExhaustionReason::NotRenewable);
        assert!(event.is_terminal());
        assert_eq!(event.reason, Some(ExhaustionReason::NotRenewable));
        assert_eq!(event.ttl, None);
    }
}
