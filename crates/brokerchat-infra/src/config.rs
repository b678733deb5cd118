//! Global configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.brokerchat/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use brokerchat_types::config::{AssistantConfig, GlobalConfig};

/// Shortest assistant deadline accepted from configuration.
pub const MIN_ASSISTANT_TIMEOUT_MS: u64 = 1_000;

/// Data directory from `BROKERCHAT_DATA_DIR`, else `~/.brokerchat`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("BROKERCHAT_DATA_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".brokerchat")
        }
    }
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Resolve the assistant webhook URL.
///
/// An explicit override (the `BROKERCHAT_ASSISTANT_URL` variable or a CLI
/// flag) wins over `config.toml`. Blank values count as unset.
pub fn resolve_endpoint(config: &AssistantConfig, override_url: Option<&str>) -> Option<String> {
    let non_blank = |url: &str| {
        let url = url.trim();
        (!url.is_empty()).then(|| url.to_string())
    };
    override_url
        .and_then(non_blank)
        .or_else(|| config.endpoint_url.as_deref().and_then(non_blank))
}

/// Resolve the assistant deadline, floored at [`MIN_ASSISTANT_TIMEOUT_MS`].
pub fn resolve_timeout(config: &AssistantConfig) -> Duration {
    Duration::from_millis(config.timeout_ms.max(MIN_ASSISTANT_TIMEOUT_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.assistant.timeout_ms, 30_000);
        assert!(config.assistant.endpoint_url.is_none());
        assert!(config.identity.is_none());
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[assistant]
endpoint_url = "https://n8n.example.com/webhook/broker-assistant"
timeout_ms = 45000
auth_token_env = "N8N_TOKEN"

[identity]
user_id = "0190f5a4-7b3c-7def-8123-456789abcdef"
email = "broker@example.com"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.assistant.timeout_ms, 45_000);
        assert_eq!(
            config.assistant.endpoint_url.as_deref(),
            Some("https://n8n.example.com/webhook/broker-assistant")
        );
        assert_eq!(config.assistant.auth_token_env.as_deref(), Some("N8N_TOKEN"));
        let identity = config.identity.unwrap();
        assert_eq!(identity.email, "broker@example.com");
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.assistant.timeout_ms, 30_000);
        assert!(config.identity.is_none());
    }

    #[test]
    fn resolve_endpoint_prefers_override() {
        let config = AssistantConfig {
            endpoint_url: Some("https://from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_endpoint(&config, Some("https://from-env")).as_deref(),
            Some("https://from-env")
        );
        assert_eq!(
            resolve_endpoint(&config, None).as_deref(),
            Some("https://from-config")
        );
    }

    #[test]
    fn resolve_endpoint_treats_blank_as_unset() {
        let config = AssistantConfig {
            endpoint_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(resolve_endpoint(&config, None).is_none());
        assert!(resolve_endpoint(&AssistantConfig::default(), Some("")).is_none());
    }

    #[test]
    fn resolve_endpoint_blank_override_falls_back_to_config() {
        let config = AssistantConfig {
            endpoint_url: Some("https://from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_endpoint(&config, Some("")).as_deref(),
            Some("https://from-config")
        );
        assert_eq!(
            resolve_endpoint(&config, Some("  ")).as_deref(),
            Some("https://from-config")
        );
    }

    #[test]
    fn resolve_timeout_enforces_minimum() {
        let mut config = AssistantConfig::default();
        assert_eq!(resolve_timeout(&config), Duration::from_millis(30_000));

        config.timeout_ms = 250;
        assert_eq!(
            resolve_timeout(&config),
            Duration::from_millis(MIN_ASSISTANT_TIMEOUT_MS)
        );
    }
}
