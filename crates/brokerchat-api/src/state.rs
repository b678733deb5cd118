//! Application state wiring the turn store, identity, and assistant together.
//!
//! Core components are generic over their ports; AppState pins them to the
//! concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use uuid::Uuid;

use brokerchat_core::chat::orchestrator::ConversationOrchestrator;
use brokerchat_core::chat::session::SessionManager;
use brokerchat_infra::assistant::transport_from_config;
use brokerchat_infra::assistant::webhook::WebhookAssistantTransport;
use brokerchat_infra::config::{
    load_global_config, resolve_data_dir, resolve_endpoint, resolve_timeout,
};
use brokerchat_infra::sqlite::pool::{DatabasePool, database_url_in};
use brokerchat_infra::sqlite::turn::SqliteTurnRepository;
use brokerchat_types::config::GlobalConfig;
use brokerchat_types::identity::UserIdentity;

/// Concrete type aliases for the generics pinned to infra implementations.
pub type ConcreteOrchestrator =
    ConversationOrchestrator<WebhookAssistantTransport, SqliteTurnRepository>;

pub type ConcreteSessionManager = SessionManager<SqliteTurnRepository>;

/// Command-line overrides applied on top of `config.toml`.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub assistant_url: Option<String>,
}

/// Shared application state for all commands.
pub struct AppState {
    pub repo: Arc<SqliteTurnRepository>,
    pub identity: UserIdentity,
    pub config: GlobalConfig,
    pub assistant_url: Option<String>,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to the store,
    /// resolve who is signed in.
    pub async fn init(overrides: Overrides) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let identity = resolve_identity(&config, &overrides)?;
        let assistant_url = resolve_endpoint(&config.assistant, overrides.assistant_url.as_deref());
        let timeout = resolve_timeout(&config.assistant);

        let db_pool = DatabasePool::new(&database_url_in(&data_dir))
            .await
            .context("Failed to open the conversation store")?;

        Ok(Self {
            repo: Arc::new(SqliteTurnRepository::new(db_pool)),
            identity,
            config,
            assistant_url,
            timeout,
            data_dir,
        })
    }

    /// A session manager over the store, for commands that don't talk to the
    /// assistant.
    pub fn session_manager(&self) -> ConcreteSessionManager {
        SessionManager::new(Arc::clone(&self.repo))
    }

    /// Wire an orchestrator for an interactive chat.
    ///
    /// Fails when no assistant endpoint is configured.
    pub fn orchestrator(&self) -> anyhow::Result<ConcreteOrchestrator> {
        let Some(url) = self.assistant_url.as_deref() else {
            bail!(
                "No assistant endpoint configured. Set [assistant] endpoint_url in {} \
                 or BROKERCHAT_ASSISTANT_URL",
                self.data_dir.join("config.toml").display()
            );
        };
        let transport = transport_from_config(url, &self.config.assistant);
        Ok(
            ConversationOrchestrator::new(transport, Arc::clone(&self.repo), self.identity.clone())
                .with_timeout(self.timeout),
        )
    }
}

/// Flags win over the `[identity]` table, field by field.
fn resolve_identity(config: &GlobalConfig, overrides: &Overrides) -> anyhow::Result<UserIdentity> {
    let configured = config.identity.clone();
    let user_id = overrides
        .user_id
        .or(configured.as_ref().map(|i| i.user_id));
    let email = overrides
        .email
        .clone()
        .or(configured.map(|i| i.email))
        .filter(|e| !e.trim().is_empty());

    match (user_id, email) {
        (Some(user_id), Some(email)) if !user_id.is_nil() => Ok(UserIdentity::new(user_id, email)),
        _ => bail!(
            "No signed-in broker. Pass --user-id and --email, or add an [identity] table to config.toml"
        ),
    }
}
