use thiserror::Error;

use crate::error::SpectraError;

/// Errors raised while resolving the signed-in user's credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not authenticated")]
    NotLoggedIn,
    #[error("ID token expired; refresh required")]
    Expired,
    #[error("Invalid ID token: {0}")]
    InvalidToken(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<base64::DecodeError> for AuthError {
    fn from(error: base64::DecodeError) -> Self {
        Self::InvalidToken(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for SpectraError {
    fn from(error: AuthError) -> Self {
        SpectraError::Authentication(error.to_string())
    }
}
