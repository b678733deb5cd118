//! Global configuration types.
//!
//! `GlobalConfig` represents `config.toml` in the data directory: where the
//! assistant webhook lives, how long to wait for it, and optionally who the
//! signed-in broker is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assistant::DEFAULT_ASSISTANT_TIMEOUT_MS;
use crate::identity::UserIdentity;

/// Top-level configuration. All fields have defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Signed-in broker. When absent the CLI requires `--user-id`/`--email`.
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
}

/// Assistant webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Webhook URL of the assistant workflow.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Deadline for one assistant call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Name of the environment variable holding a bearer token for the
    /// webhook, if it requires header auth.
    #[serde(default)]
    pub auth_token_env: Option<String>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_ASSISTANT_TIMEOUT_MS
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            timeout_ms: default_timeout_ms(),
            auth_token_env: None,
        }
    }
}

/// `[identity]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_id: Uuid,
    pub email: String,
}

impl From<IdentityConfig> for UserIdentity {
    fn from(config: IdentityConfig) -> Self {
        UserIdentity::new(config.user_id, config.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.assistant.timeout_ms, 30_000);
        assert!(config.assistant.endpoint_url.is_none());
        assert!(config.identity.is_none());
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.assistant.timeout_ms, 30_000);
        assert!(config.assistant.auth_token_env.is_none());
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
[assistant]
endpoint_url = "https://n8n.example.com/webhook/broker-assistant"
timeout_ms = 45000
auth_token_env = "N8N_WEBHOOK_TOKEN"

[identity]
user_id = "0192f5a4-7c3e-7b41-9d2a-3f1e8c6b5a40"
email = "broker@example.com"
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.assistant.endpoint_url.as_deref(),
            Some("https://n8n.example.com/webhook/broker-assistant")
        );
        assert_eq!(config.assistant.timeout_ms, 45_000);

        let identity: UserIdentity = config.identity.unwrap().into();
        assert_eq!(identity.email, "broker@example.com");
    }
}
