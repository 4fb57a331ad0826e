use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlates one user turn with every assistant entry produced for it.
///
/// Not a message identifier: several transcript entries share the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: RequestId,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(id: RequestId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(id: RequestId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_assistant_for(&self, id: RequestId) -> bool {
        self.role == Role::Assistant && self.id == id
    }
}
