use super::{InteractionKey, PageRequest, ResourceType};
use serde::{Deserialize, Serialize};
use std::fmt;

const HEAD_SEGMENT: &str = ":head";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// 一覧の先頭ページを指すキーか
    pub fn is_head_page(&self) -> bool {
        self.0.ends_with(HEAD_SEGMENT)
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Cache key cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn like_state(key: &InteractionKey) -> Self {
        Self(format!(
            "{}{}",
            Self::like_state_prefix(key.resource_type, &key.resource_id),
            key.actor_id
        ))
    }

    pub fn count(resource_id: &str) -> Self {
        Self(format!("count:{resource_id}"))
    }

    pub fn comments_page(resource_id: &str, page: &PageRequest) -> Self {
        Self(format!(
            "{}{}",
            Self::comments_prefix(resource_id),
            page.cache_segment()
        ))
    }

    pub fn likes_page(resource_id: &str, page: &PageRequest) -> Self {
        Self(format!(
            "{}{}",
            Self::likes_prefix(resource_id),
            page.cache_segment()
        ))
    }

    /// 対象リソースに対する全ユーザーのいいね状態
    pub fn like_state_prefix(resource_type: ResourceType, resource_id: &str) -> String {
        format!("like:{resource_type}:{resource_id}:")
    }

    pub fn comments_prefix(resource_id: &str) -> String {
        format!("comments:{resource_id}:")
    }

    pub fn likes_prefix(resource_id: &str) -> String {
        format!("likes:{resource_id}:")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
