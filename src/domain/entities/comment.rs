use super::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub resource_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_color: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// サーバー未確定のローカル生成コメント
    #[serde(default)]
    pub is_pending: bool,
}

impl Comment {
    /// 楽観的更新用に一時 ID 付きのコメントを作る
    pub fn pending(
        resource_id: impl Into<String>,
        author: &Actor,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            resource_id: resource_id.into(),
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            author_color: author.color.clone(),
            text: text.into(),
            created_at,
            is_pending: true,
        }
    }

    pub fn has_temporary_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}
