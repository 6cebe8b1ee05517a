//! User identity as supplied by the external identity provider.

use serde::{Deserialize, Serialize};

/// An authenticated user. Only `id` is used by relaychat, as the opaque
/// owner of sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    /// Owner key under which this user's sessions are stored.
    pub fn owner(&self) -> &str {
        &self.id
    }
}
