//! WebhookAssistantTransport -- concrete [`AssistantTransport`] for an n8n
//! assistant workflow exposed as an HTTP webhook.
//!
//! One POST per turn with the request as a camelCase JSON body. The workflow
//! answers `{ "output": "..." }`, or `{ "error": "..." }` when it failed
//! internally. There are no retries here; the caller decides.
//!
//! An optional bearer token is held as a [`SecretString`] and only exposed
//! when the `Authorization` header is built.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use brokerchat_core::assistant::transport::AssistantTransport;
use brokerchat_core::assistant::validate::validate_request;
use brokerchat_types::assistant::{AssistantReply, AssistantRequest};
use brokerchat_types::error::AssistantError;

/// Assistant reached through an HTTP webhook.
///
/// Does not derive `Debug` so the token can't end up in logs.
pub struct WebhookAssistantTransport {
    client: reqwest::Client,
    endpoint_url: String,
    auth_token: Option<SecretString>,
}

impl WebhookAssistantTransport {
    /// Create a transport posting to `endpoint_url`.
    ///
    /// The client has no timeout of its own; each call gets the deadline
    /// passed to [`AssistantTransport::send`].
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            endpoint_url: endpoint_url.into(),
            auth_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// POST the request and read the whole body.
    async fn exchange(&self, request: &AssistantRequest) -> Result<(u16, String), AssistantError> {
        let mut builder = self
            .client
            .post(&self.endpoint_url)
            .header("content-type", "application/json")
            .json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::Network(format!("HTTP request failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AssistantError::Network(format!("failed to read response: {e}")))?;
        Ok((status, body))
    }
}

/// Turn a 2xx body into the reply text.
fn parse_reply(body: &str) -> Result<String, AssistantError> {
    let reply: AssistantReply = serde_json::from_str(body)
        .map_err(|e| AssistantError::Protocol(format!("failed to parse response: {e}")))?;

    if let Some(error) = reply.error.filter(|e| !e.trim().is_empty()) {
        return Err(AssistantError::Protocol(error));
    }
    reply
        .output
        .filter(|o| !o.trim().is_empty())
        .ok_or_else(|| AssistantError::Protocol("no reply received".to_string()))
}

impl AssistantTransport for WebhookAssistantTransport {
    fn name(&self) -> &str {
        "n8n-webhook"
    }

    async fn send(
        &self,
        request: &AssistantRequest,
        timeout: Duration,
    ) -> Result<String, AssistantError> {
        validate_request(request)?;

        let timeout_ms = timeout.as_millis() as u64;
        let (status, body) = tokio::time::timeout(timeout, self.exchange(request))
            .await
            .map_err(|_| AssistantError::Timeout { timeout_ms })??;

        if !(200..300).contains(&status) {
            tracing::warn!(status, "Assistant webhook returned an error status");
            return Err(AssistantError::Transport { status, body });
        }

        let reply = parse_reply(&body)?;
        tracing::debug!(reply_len = reply.len(), "Assistant webhook replied");
        Ok(reply)
    }
}
