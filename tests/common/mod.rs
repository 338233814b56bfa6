//! Shared test helpers: fake ID tokens and mock-backend configuration.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use wiremock::MockServer;

use spectra::auth::{CredentialSource, IdToken, StaticCredentials};
use spectra::config::SpectraConfig;
use spectra::types::{LogEntry, LogSource};

pub const UID: &str = "user-1";

/// An unsigned JWT carrying `claims`; only the payload is ever read.
pub fn fake_jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

pub fn token_for(uid: &str) -> String {
    fake_jwt(json!({ "user_id": uid, "email": format!("{uid}@example.com") }))
}

pub fn credentials_for(uid: &str) -> Arc<dyn CredentialSource> {
    Arc::new(StaticCredentials::from_token(IdToken::new(token_for(uid))).unwrap())
}

pub fn credentials() -> Arc<dyn CredentialSource> {
    credentials_for(UID)
}

/// Config pointing at `server`, with no provisioning warm-up.
pub fn config_for(server: &MockServer) -> SpectraConfig {
    SpectraConfig::builder()
        .backend_url(server.uri())
        .ready_delay(Duration::ZERO)
        .build()
}

pub fn pairs(entries: &[LogEntry]) -> Vec<(LogSource, String)> {
    entries
        .iter()
        .map(|entry| (entry.source, entry.message.clone()))
        .collect()
}
