//! Error classification and recovery hints.

use strum::Display;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    Reauthenticate,
    CheckBackend,
    CheckConfiguration,
    IncreaseTimeout,
    ContactSupport,
}

impl RecoverySuggestion {
    /// Short human-readable hint.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::RetryWithBackoff => "try again in a moment",
            Self::Reauthenticate => "sign in again to obtain a fresh ID token",
            Self::CheckBackend => "check that the backend is reachable",
            Self::CheckConfiguration => "check the backend URL and app name",
            Self::IncreaseTimeout => "increase the request timeout",
            Self::ContactSupport => "contact the session administrator",
        }
    }
}
