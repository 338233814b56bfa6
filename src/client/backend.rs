//! Typed calls to the session backend's REST endpoints.

use std::sync::Arc;

use reqwest::Url;
use serde_json::json;
use tracing::debug;

use super::http::{bearer_headers, build_client, error_message, read_json};
use crate::config::SpectraConfig;
use crate::error::{Result, SpectraError};
use crate::types::{EndSessionResponse, StartSessionResponse};

const AGENT_SESSION_EXISTS: &str = "Session already exists";

/// Client for `/start-session`, `/end-session`, and agent-session creation.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: Arc<SpectraConfig>,
}

impl BackendClient {
    pub fn new(config: SpectraConfig) -> Result<Self> {
        Ok(Self::with_client(config, build_client()?))
    }

    pub fn with_client(config: SpectraConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SpectraConfig {
        &self.config
    }

    /// Provision (or reuse) the caller's browser session.
    pub async fn start_session(
        &self,
        token: &str,
        enable_recording: bool,
    ) -> Result<StartSessionResponse> {
        let url = self.config.endpoint("start-session");
        debug!(%url, enable_recording, "start-session");
        let response = self
            .http
            .post(url)
            .headers(bearer_headers(token))
            .timeout(self.config.request_timeout)
            .json(&json!({ "enable_recording": enable_recording }))
            .send()
            .await?;
        read_json(response).await
    }

    /// Tear down the caller's browser session.
    pub async fn end_session(&self, token: &str) -> Result<EndSessionResponse> {
        let url = self.config.endpoint("end-session");
        debug!(%url, "end-session");
        let response = self
            .http
            .post(url)
            .headers(bearer_headers(token))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        read_json(response).await
    }

    /// Register `session_id` with the agent service.
    ///
    /// An agent session that already exists counts as created.
    pub async fn create_agent_session(
        &self,
        token: &str,
        uid: &str,
        session_id: &str,
    ) -> Result<()> {
        let url = self.agent_session_url(uid, session_id)?;
        debug!(%url, "create agent session");
        let response = self
            .http
            .post(url)
            .headers(bearer_headers(token))
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        let message = error_message(status.as_u16(), &body);
        if status.as_u16() == 400 && message.contains(AGENT_SESSION_EXISTS) {
            debug!(session_id, "agent session already exists");
            return Ok(());
        }
        Err(super::http::status_to_error(status.as_u16(), &body))
    }

    fn agent_session_url(&self, uid: &str, session_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoint("agent"))
            .map_err(|e| SpectraError::Configuration(format!("invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SpectraError::Configuration("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["apps", self.config.app_name.as_str(), "users", uid, "sessions", session_id]);
        Ok(url)
    }
}
