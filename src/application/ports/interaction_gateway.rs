use crate::domain::entities::{Actor, Comment, Like};
use crate::domain::value_objects::{PageRequest, ResourceType};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub like_count: u32,
    pub reply_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub cursor: Option<String>,
}

impl<T> RemotePage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
            cursor: None,
        }
    }
}

/// 購読で届くいいね一覧の先頭ページと集計値
#[derive(Debug, Clone, PartialEq)]
pub struct LikesSnapshot {
    pub resource_id: String,
    pub likes: Vec<Like>,
    pub like_count: u32,
    pub has_more: bool,
    pub cursor: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// 購読で届くコメント一覧の先頭ページと集計値
#[derive(Debug, Clone, PartialEq)]
pub struct CommentsSnapshot {
    pub resource_id: String,
    pub comments: Vec<Comment>,
    pub reply_count: u32,
    pub has_more: bool,
    pub cursor: Option<String>,
    pub observed_at: DateTime<Utc>,
}

pub type SnapshotStream<T> = BoxStream<'static, T>;

/// リモートのドキュメントストアへのポート。
///
/// 書き込みエラーは発生箇所で分類する: 同一操作が進行中なら
/// `AppError::OperationInProgress`、それ以外は `AppError::RemoteWriteFailed`。
#[async_trait]
pub trait InteractionGateway: Send + Sync {
    /// いいねを反転する（冪等ではない。呼ぶたびに反転する）
    async fn like_resource(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        actor: &Actor,
    ) -> Result<(), AppError>;

    async fn has_liked(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        actor_id: &str,
    ) -> Result<bool, AppError>;

    async fn get_resource(&self, resource_id: &str) -> Result<Option<ResourceCounts>, AppError>;

    /// コメントを追加し、サーバー側で採番された ID を返す
    async fn add_comment(
        &self,
        resource_id: &str,
        actor: &Actor,
        text: &str,
    ) -> Result<String, AppError>;

    async fn delete_comment(&self, comment_id: &str, actor_id: &str) -> Result<(), AppError>;

    async fn get_comments_page(
        &self,
        resource_id: &str,
        page: &PageRequest,
    ) -> Result<RemotePage<Comment>, AppError>;

    async fn get_likes_page(
        &self,
        resource_id: &str,
        page: &PageRequest,
    ) -> Result<RemotePage<Like>, AppError>;

    async fn subscribe_to_resource_likes(
        &self,
        resource_id: &str,
    ) -> Result<SnapshotStream<LikesSnapshot>, AppError>;

    async fn subscribe_to_comments(
        &self,
        resource_id: &str,
    ) -> Result<SnapshotStream<CommentsSnapshot>, AppError>;
}
