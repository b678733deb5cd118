//! Assistant transport implementations.
//!
//! [`webhook::WebhookAssistantTransport`] is the production transport. Use
//! [`transport_from_config`] to build one from `config.toml` settings.

pub mod webhook;

use secrecy::SecretString;

use brokerchat_types::config::AssistantConfig;

use self::webhook::WebhookAssistantTransport;

/// Build the webhook transport for `endpoint_url`, attaching a bearer token
/// when `config.auth_token_env` names a set, non-empty variable.
pub fn transport_from_config(
    endpoint_url: &str,
    config: &AssistantConfig,
) -> WebhookAssistantTransport {
    let transport = WebhookAssistantTransport::new(endpoint_url);

    let Some(var) = config.auth_token_env.as_deref() else {
        return transport;
    };
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => {
            tracing::debug!(env = var, "Using bearer token for assistant webhook");
            transport.with_auth_token(SecretString::from(token))
        }
        _ => {
            tracing::warn!(env = var, "Assistant token variable is unset or empty; sending without auth");
            transport
        }
    }
}
