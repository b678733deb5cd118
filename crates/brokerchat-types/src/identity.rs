//! The signed-in user, passed explicitly into every chat operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the broker using the chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: String,
}

impl UserIdentity {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}
