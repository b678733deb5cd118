//! AssistantTransport trait definition.
//!
//! Follows the same RPITIT pattern as `TurnRepository`. Implementations live
//! in brokerchat-infra (e.g., `WebhookAssistantTransport`).

use std::time::Duration;

use brokerchat_types::assistant::AssistantRequest;
use brokerchat_types::error::AssistantError;

/// Sends one chat turn to the external assistant and returns its reply text.
///
/// Implementations must:
/// - validate the request before any network I/O (see [`validate_request`]);
/// - enforce `timeout` over the whole exchange and report it as
///   [`AssistantError::Timeout`] carrying the timeout in milliseconds;
/// - perform no retries.
///
/// [`validate_request`]: super::validate::validate_request
pub trait AssistantTransport: Send + Sync {
    /// Human-readable transport name for logs (e.g., "n8n-webhook").
    fn name(&self) -> &str;

    fn send(
        &self,
        request: &AssistantRequest,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<String, AssistantError>> + Send;
}
