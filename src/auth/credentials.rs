//! The seam through which services obtain the current user's credentials.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use super::error::AuthError;
use super::store::TokenStore;
use super::token::{IdToken, Identity};

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Identity plus the bearer token to present to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: Identity,
    pub id_token: IdToken,
}

impl Credentials {
    pub fn from_token(id_token: IdToken) -> Result<Self, AuthError> {
        let identity = id_token.identity()?;
        Ok(Self { identity, id_token })
    }

    pub fn bearer(&self) -> &str {
        &self.id_token.token
    }
}

/// Source of credentials for backend calls.
///
/// Resolved on every call, so a refreshed token is picked up without
/// rebuilding the services that use it.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, AuthError>;
}

/// A fixed identity and token.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(identity: Identity, id_token: IdToken) -> Self {
        Self {
            credentials: Credentials { identity, id_token },
        }
    }

    /// Derive the identity from the token's claims.
    pub fn from_token(id_token: IdToken) -> Result<Self, AuthError> {
        Ok(Self {
            credentials: Credentials::from_token(id_token)?,
        })
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        Ok(self.credentials.clone())
    }
}

/// Credentials read from a [`TokenStore`] profile on each call.
pub struct StoredCredentials {
    store: Arc<dyn TokenStore>,
    profile: String,
}

impl StoredCredentials {
    pub fn new(store: Arc<dyn TokenStore>, profile: impl Into<String>) -> Self {
        Self {
            store,
            profile: profile.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for StoredCredentials {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        let token = self
            .store
            .load(&self.profile)?
            .ok_or(AuthError::NotLoggedIn)?;
        if token.is_expired(Duration::seconds(EXPIRY_SKEW_SECS)) {
            return Err(AuthError::Expired);
        }
        Credentials::from_token(token)
    }
}
