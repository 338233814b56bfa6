//! Streaming agent runs.

use std::sync::Arc;

use bon::Builder;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::http::{bearer_headers, build_client, status_to_error};
use crate::auth::CredentialSource;
use crate::config::SpectraConfig;
use crate::error::Result;
use crate::sse::decode_stream;
use crate::types::{LogEntry, NewMessage};

/// A user message to run through the agent in an existing session.
#[derive(Debug, Clone, Builder)]
pub struct RunRequest {
    #[builder(into)]
    pub session_id: String,
    #[builder(into)]
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunBody<'a> {
    app_name: &'a str,
    user_id: &'a str,
    session_id: &'a str,
    new_message: NewMessage,
}

/// Client for the agent service's streaming endpoint.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    config: Arc<SpectraConfig>,
    credentials: Arc<dyn CredentialSource>,
}

impl AgentClient {
    pub fn new(config: SpectraConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        Ok(Self::with_client(config, credentials, build_client()?))
    }

    pub fn with_client(
        config: SpectraConfig,
        credentials: Arc<dyn CredentialSource>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            config: Arc::new(config),
            credentials,
        }
    }

    /// Run `request` and stream the agent's events as transcript entries.
    ///
    /// Entries arrive as soon as their record is complete. A failed request
    /// yields exactly one `system` entry. Cancelling `cancel` (or dropping the
    /// stream) ends it quietly, discarding any partially received record.
    pub fn run_sse(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> BoxStream<'static, LogEntry> {
        let client = self.clone();

        Box::pin(async_stream::stream! {
            let opened = tokio::select! {
                _ = cancel.cancelled() => None,
                response = client.open(&request) => Some(response),
            };
            let Some(opened) = opened else {
                debug!(session_id = %request.session_id, "agent run cancelled before response");
                return;
            };
            let response = match opened {
                Ok(response) => response,
                Err(e) => {
                    yield LogEntry::system(format!("Agent request failed: {e}"));
                    return;
                }
            };

            let entries = decode_stream(response.bytes_stream());
            futures::pin_mut!(entries);

            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(session_id = %request.session_id, "agent run cancelled mid-stream");
                        None
                    }
                    next = entries.next() => next,
                };
                match next {
                    Some(entry) => {
                        yield entry;
                    }
                    None => break,
                }
            }
        })
    }

    async fn open(&self, request: &RunRequest) -> Result<reqwest::Response> {
        let credentials = self.credentials.credentials().await?;
        let request_id = Uuid::new_v4();
        let body = RunBody {
            app_name: &self.config.app_name,
            user_id: &credentials.identity.uid,
            session_id: &request.session_id,
            new_message: NewMessage::user_text(request.message.as_str()),
        };

        debug!(%request_id, session_id = %request.session_id, "agent run_sse");

        let response = self
            .http
            .post(self.config.endpoint("agent/run_sse"))
            .headers(bearer_headers(credentials.bearer()))
            .header(ACCEPT, "text/event-stream")
            .header("x-request-id", request_id.to_string())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }
        Ok(response)
    }
}
