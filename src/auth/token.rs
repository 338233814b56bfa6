use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// A Firebase ID token as issued to the signed-in user.
///
/// The token is a JWT; only its payload is read here (for the user id and
/// expiry). Signature verification is the backend's job.
///
/// # Example
/// ```no_run
/// use spectra::auth::IdToken;
///
/// let token = IdToken::new("eyJhbGciOi...".to_string());
/// if token.is_expired(chrono::Duration::seconds(30)) {
///     // ask the identity provider for a fresh token
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The signed-in user as described by the token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    user_id: Option<String>,
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    exp: Option<i64>,
}

impl IdToken {
    /// Wrap a raw token, reading its expiry when the payload is decodable.
    pub fn new(token: String) -> Self {
        let expires_at = decode_claims(&token)
            .ok()
            .and_then(|claims| claims.exp)
            .and_then(|exp| DateTime::from_timestamp(exp, 0));
        Self { token, expires_at }
    }

    /// Identity claims carried by the token.
    pub fn identity(&self) -> Result<Identity, AuthError> {
        let claims = decode_claims(&self.token)?;
        let uid = claims
            .user_id
            .or(claims.sub)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("missing user_id/sub claim".to_string()))?;
        Ok(Identity {
            uid,
            name: claims.name,
            email: claims.email,
            photo: claims.picture,
        })
    }

    /// Whether the token expires within `skew` from now. Tokens without an
    /// expiry are treated as valid.
    pub fn is_expired(&self, skew: Duration) -> bool {
        self.expires_at
            .map(|exp| exp <= Utc::now() + skew)
            .unwrap_or(false)
    }
}

fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("not a JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) fn fake_jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
