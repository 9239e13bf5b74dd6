use super::ResourceType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1 ユーザーと 1 つのいいね対象の関係を指すキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionKey {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub actor_id: String,
}

impl InteractionKey {
    pub fn new(
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.into(),
            actor_id: actor_id.into(),
        }
    }

    pub fn whisper(resource_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self::new(ResourceType::WhisperLike, resource_id, actor_id)
    }

    pub fn comment(resource_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self::new(ResourceType::CommentLike, resource_id, actor_id)
    }
}

impl fmt::Display for InteractionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.resource_type, self.resource_id, self.actor_id
        )
    }
}
